//! Hitbox система для combat
//!
//! Архитектура:
//! - Hitbox атаки существует только в момент удара (один вызов resolver'а)
//! - Axis-aligned box в плоскости xy (side view), offset зеркалится по Facing
//! - Тела получают удар через `Hurtbox` + rapier `CollisionGroups` (membership = слой)
//! - `overlap_region` — spatial query: все тела нужного слоя пересекающие регион

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionGroups, Group};

use crate::combat::sequencer::AttackSequencer;
use crate::config::AttackConfig;
use crate::components::Health;

/// Слой игрока
pub const PLAYER_LAYER: Group = Group::GROUP_1;
/// Слой врагов
pub const ENEMY_LAYER: Group = Group::GROUP_2;

/// Регион удара: центр + half-extents (AABB в плоскости xy)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitboxRegion {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl HitboxRegion {
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Регион атаки: `position + (offset.x * facing, offset.y)`
    pub fn for_attack(position: Vec2, facing: f32, offset: Vec2, half_extents: Vec2) -> Self {
        Self::new(
            position + Vec2::new(offset.x * facing, offset.y),
            half_extents,
        )
    }

    pub fn overlaps(&self, other: &HitboxRegion) -> bool {
        let delta = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        delta.x <= reach.x && delta.y <= reach.y
    }
}

/// Hurtbox тела (half-extents вокруг Transform)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Hurtbox {
    pub half_extents: Vec2,
}

impl Default for Hurtbox {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(0.25, 0.5),
        }
    }
}

impl Hurtbox {
    pub fn region_at(&self, position: Vec2) -> HitboxRegion {
        HitboxRegion::new(position, self.half_extents)
    }
}

/// Проходит ли тело layer filter атаки
pub fn matches_layers(groups: Option<&CollisionGroups>, filter: Group) -> bool {
    groups
        .map(|groups| groups.memberships.intersects(filter))
        .unwrap_or(false)
}

/// Spatial query (`overlapRegion`): все тела с hurtbox в регионе, прошедшие layer filter.
///
/// Порядок результата не важен — каждое тело резолвится независимо.
pub fn overlap_region<'a>(
    region: &HitboxRegion,
    filter: Group,
    bodies: impl IntoIterator<Item = (Entity, &'a Transform, &'a Hurtbox, Option<&'a CollisionGroups>)>,
) -> Vec<Entity> {
    bodies
        .into_iter()
        .filter(|(_, _, _, groups)| matches_layers(*groups, filter))
        .filter(|(_, transform, hurtbox, _)| {
            hurtbox
                .region_at(transform.translation.truncate())
                .overlaps(region)
        })
        .map(|(entity, ..)| entity)
        .collect()
}

/// Система: выбор цели для sequenced атакующих
///
/// Ближайшее живое тело нужного слоя (кроме себя). Цель которая исчезла или умерла
/// сбрасывается в None — stale reference, не ошибка.
pub fn acquire_attack_targets(
    mut attackers: Query<(Entity, &Transform, &AttackConfig, &mut AttackSequencer)>,
    bodies: Query<(Entity, &Transform, &Health, Option<&CollisionGroups>)>,
) {
    for (attacker, transform, config, mut sequencer) in attackers.iter_mut() {
        let position = transform.translation.truncate();
        let filter = config.target_group();

        let nearest = bodies
            .iter()
            .filter(|(entity, _, health, groups)| {
                *entity != attacker && health.is_alive() && matches_layers(*groups, filter)
            })
            .map(|(entity, body, ..)| (entity, body.translation.truncate().distance(position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity);

        if sequencer.target != nearest {
            sequencer.target = nearest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_mirrors_offset_by_facing() {
        let right = HitboxRegion::for_attack(Vec2::ZERO, 1.0, Vec2::new(1.0, 0.5), Vec2::splat(0.5));
        let left = HitboxRegion::for_attack(Vec2::ZERO, -1.0, Vec2::new(1.0, 0.5), Vec2::splat(0.5));

        assert_eq!(right.center, Vec2::new(1.0, 0.5));
        assert_eq!(left.center, Vec2::new(-1.0, 0.5));
    }

    #[test]
    fn test_region_overlap() {
        let hitbox = HitboxRegion::new(Vec2::new(1.0, 0.0), Vec2::splat(0.5));

        let near = HitboxRegion::new(Vec2::new(1.6, 0.0), Vec2::new(0.25, 0.5)); // 0.6 ≤ 0.75 ✓
        let far = HitboxRegion::new(Vec2::new(2.0, 0.0), Vec2::new(0.25, 0.5)); // 1.0 > 0.75 ✗
        let above = HitboxRegion::new(Vec2::new(1.0, 2.0), Vec2::new(0.25, 0.5));

        assert!(hitbox.overlaps(&near));
        assert!(!hitbox.overlaps(&far));
        assert!(!hitbox.overlaps(&above));
    }

    #[test]
    fn test_overlap_region_filters_layers() {
        let hurtbox = Hurtbox::default();
        let at_player = Transform::from_xyz(1.0, 0.0, 0.0);
        let at_enemy = Transform::from_xyz(1.0, 0.0, 0.0);
        let player_groups = CollisionGroups::new(PLAYER_LAYER, Group::ALL);
        let enemy_groups = CollisionGroups::new(ENEMY_LAYER, Group::ALL);

        let player = Entity::from_raw(1);
        let enemy = Entity::from_raw(2);
        let ghost = Entity::from_raw(3);

        let region = HitboxRegion::new(Vec2::new(1.0, 0.0), Vec2::splat(0.5));
        let hits = overlap_region(
            &region,
            PLAYER_LAYER,
            [
                (player, &at_player, &hurtbox, Some(&player_groups)),
                (enemy, &at_enemy, &hurtbox, Some(&enemy_groups)),
                (ghost, &at_enemy, &hurtbox, None),
            ],
        );

        assert_eq!(hits, vec![player]);
    }
}
