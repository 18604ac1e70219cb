//! Impact resolver и смерть
//!
//! `resolve_attack_impacts` — единственный mutator чужих Health/ParryWindow во время удара.
//! Для каждого тела в hitbox атакующего (порядок не важен):
//!
//! 1. Нет Health или уже мёртв → пропуск
//! 2. Parry сработал → knockback проигравшему, урона нет
//! 3. Invincible → пропуск (ни урона, ни knockback)
//! 4. Урон + knockback по направлению атакующий → тело
//! 5. hp ≤ 0 → Dead: knockback из шага 4 с множителем на горизонталь, Death hold, despawn через `death_delay`
//!
//! Все исходы удара записываются до того как sequencer уйдёт в Cooldown (тот же тик).

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionGroups, ExternalImpulse, Velocity};

use crate::combat::events::{AttackImpact, DamageDealt, EntityDied, ParrySuccess};
use crate::combat::hitbox::{overlap_region, HitboxRegion, Hurtbox};
use crate::combat::parry::{
    parry_knockback, HitStop, ParryFlash, ParrySide, ParryWindow, Stagger, STUN_DURATION,
};
use crate::components::{
    CombatWeight, DamageOutcome, Facing, Health, KnockbackLock, Locomotion, LocomotionHold, Tint,
    DEFAULT_WEIGHT,
};
use crate::config::{AttackConfig, HealthConfig, ParryConfig};

/// Компонент-маркер: entity мертв (Health <= 0)
///
/// Атака и locomotion остановлены, тело ждёт `DespawnAfter`.
#[derive(Component, Debug)]
pub struct Dead;

/// Компонент-маркер: деспавн entity после указанного времени
#[derive(Component, Debug)]
pub struct DespawnAfter {
    /// Время деспавна (`Time<Fixed>` elapsed, секунды)
    pub despawn_time: f64,
}

/// Всё что resolver может поменять у тела
type BodyState = (
    Option<&'static mut Health>,
    Option<&'static HealthConfig>,
    Option<&'static ParryWindow>,
    Option<&'static ParryConfig>,
    Option<&'static CombatWeight>,
    Option<&'static mut Velocity>,
    Option<&'static mut ExternalImpulse>,
    Option<&'static mut Locomotion>,
    Option<&'static mut Tint>,
);

/// Обнулить скорость и добавить impulse (rapier применит на следующем шаге)
fn apply_impulse(velocity: Option<Mut<Velocity>>, external: Option<Mut<ExternalImpulse>>, impulse: Vec3) {
    if let Some(mut velocity) = velocity {
        velocity.linvel = Vec3::ZERO;
    }
    if let Some(mut external) = external {
        external.impulse += impulse;
    }
}

/// Knockback прямого попадания; при смерти множитель только на горизонталь
pub fn knockback_impulse(direction: Vec2, force: f32, death_multiplier: Option<f32>) -> Vec3 {
    let horizontal = death_multiplier.unwrap_or(1.0);
    Vec3::new(direction.x * force * horizontal, direction.y * force, 0.0)
}

/// Система: резолюция ударов (hitbox → parry → invincibility → damage → death)
#[allow(clippy::too_many_arguments)]
pub fn resolve_attack_impacts(
    mut commands: Commands,
    mut impacts: EventReader<AttackImpact>,
    attackers: Query<(&Transform, &AttackConfig, Option<&Facing>, Option<&CombatWeight>)>,
    hurtboxes: Query<(Entity, &Transform, &Hurtbox, Option<&CollisionGroups>)>,
    mut bodies: Query<BodyState>,
    mut damage_events: EventWriter<DamageDealt>,
    mut parry_events: EventWriter<ParrySuccess>,
    mut death_events: EventWriter<EntityDied>,
    mut hit_stop: ResMut<HitStop>,
    mut virtual_time: ResMut<Time<Virtual>>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for impact in impacts.read() {
        // Атакующий исчез между сигналом и резолюцией — no-op
        let Ok((attacker_transform, config, facing, attacker_weight)) = attackers.get(impact.attacker)
        else {
            continue;
        };

        let attacker_position = attacker_transform.translation.truncate();
        let attacker_weight = attacker_weight.map(|weight| weight.0).unwrap_or(DEFAULT_WEIGHT);
        let facing = facing.copied().unwrap_or_default().sign();

        let region = HitboxRegion::for_attack(
            attacker_position,
            facing,
            config.hitbox_offset,
            config.half_extents(),
        );

        let hits = overlap_region(
            &region,
            config.target_group(),
            hurtboxes
                .iter()
                .filter(|(entity, ..)| *entity != impact.attacker),
        );

        for target in hits {
            let Ok((_, target_transform, ..)) = hurtboxes.get(target) else {
                continue;
            };
            let direction = (target_transform.translation.truncate() - attacker_position).normalize_or_zero();

            let Ok((health, health_config, window, parry_config, weight, velocity, external, locomotion, tint)) =
                bodies.get_mut(target)
            else {
                continue;
            };

            // 1. Нет health capability — тело не участвует
            let Some(mut health) = health else {
                continue;
            };
            if health.is_dead() {
                continue;
            }

            // 2. Parry
            if let (Some(window), Some(parry_config)) = (window, parry_config) {
                let defender_weight = weight.map(|weight| weight.0).unwrap_or(DEFAULT_WEIGHT);
                let result = window.try_intercept(now, parry_config, attacker_weight, defender_weight);

                if let Some(loser) = result.loser() {
                    let impulse = parry_knockback(loser, direction, parry_config.knockback_force);
                    let flash_duration = parry_config.flash_duration;
                    let freeze_duration = parry_config.freeze_duration;

                    if let Some(mut tint) = tint {
                        *tint = Tint::ParryFlash;
                    }

                    match loser {
                        ParrySide::Defender => apply_impulse(velocity, external, impulse),
                        ParrySide::Attacker => {
                            if let Ok((_, _, _, _, _, velocity, external, locomotion, _)) =
                                bodies.get_mut(impact.attacker)
                            {
                                apply_impulse(velocity, external, impulse);
                                if let Some(mut locomotion) = locomotion {
                                    locomotion.hold(LocomotionHold::Stun);
                                }
                                if let Ok(mut attacker) = commands.get_entity(impact.attacker) {
                                    attacker.try_insert(Stagger {
                                        remaining: STUN_DURATION,
                                    });
                                }
                            }
                        }
                    }

                    if let Ok(mut defender) = commands.get_entity(target) {
                        defender.try_insert(ParryFlash {
                            remaining: flash_duration,
                        });
                    }
                    hit_stop.start(freeze_duration, &mut virtual_time);

                    parry_events.write(ParrySuccess {
                        attacker: impact.attacker,
                        defender: target,
                        loser,
                    });

                    crate::log_info(&format!(
                        "🤺 PARRY (attacker: {:?} w={:.0}, defender: {:?} w={:.0}, knocked back: {:?})",
                        impact.attacker, attacker_weight, target, defender_weight, loser
                    ));
                    continue;
                }
            }

            // 3. I-frames
            if health.is_invincible() {
                continue;
            }

            // 4. Урон + knockback
            let health_config = health_config.cloned().unwrap_or_default();
            let outcome = health.take_damage(impact.damage, health_config.invincibility_duration);
            if outcome == DamageOutcome::Rejected {
                continue;
            }

            let died = outcome == DamageOutcome::Killed;
            let knockback = knockback_impulse(
                direction,
                health_config.knockback_force,
                died.then_some(health_config.death_knockback_multiplier),
            );

            apply_impulse(velocity, external, knockback);

            if let Some(mut locomotion) = locomotion {
                if died {
                    locomotion.hold(LocomotionHold::Death);
                } else if health_config.knockback_lock > 0.0 {
                    locomotion.hold(LocomotionHold::Knockback);
                }
            }

            if let Ok(mut body) = commands.get_entity(target) {
                if died {
                    body.try_insert((
                        Dead,
                        DespawnAfter {
                            despawn_time: now + health_config.death_delay as f64,
                        },
                    ));
                } else if health_config.knockback_lock > 0.0 {
                    body.try_insert(KnockbackLock {
                        remaining: health_config.knockback_lock,
                    });
                }
            }

            damage_events.write(DamageDealt {
                attacker: impact.attacker,
                target,
                damage: impact.damage,
                knockback,
                target_died: died,
            });

            crate::log(&format!(
                "💥 Hit {:?} → {:?}: {:.1} damage (hp: {:.1}/{:.1})",
                impact.attacker, target, impact.damage, health.current, health.max
            ));

            if died {
                death_events.write(EntityDied {
                    entity: target,
                    killer: Some(impact.attacker),
                });
                crate::log_info(&format!("☠️ Entity {:?} killed by {:?}", target, impact.attacker));
            }
        }
    }
}

/// Система: invincibility таймер + blink
pub fn tick_vitals(mut bodies: Query<(Entity, &mut Health, Option<&HealthConfig>)>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for (entity, mut health, config) in bodies.iter_mut() {
        if !health.is_invincible() {
            continue;
        }

        let blink_interval = config.map(|config| config.blink_interval).unwrap_or(0.1);
        if health.tick(delta, blink_interval) {
            crate::log(&format!("✨ Invincibility ended (entity: {:?})", entity));
        }
    }
}

/// Система: снять Knockback hold когда потеря контроля закончилась
pub fn tick_knockback_locks(
    mut commands: Commands,
    mut locked: Query<(Entity, &mut KnockbackLock, Option<&mut Locomotion>)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut lock, locomotion) in locked.iter_mut() {
        lock.remaining -= delta;
        if lock.remaining > 0.0 {
            continue;
        }

        if let Some(mut locomotion) = locomotion {
            locomotion.release(LocomotionHold::Knockback);
        }
        commands.entity(entity).remove::<KnockbackLock>();
    }
}

/// Система: деспавн entities с истёкшим DespawnAfter timeout
pub fn despawn_after_timeout(
    mut commands: Commands,
    query: Query<(Entity, &DespawnAfter)>,
    time: Res<Time<Fixed>>,
) {
    let current_time = time.elapsed_secs_f64();

    for (entity, despawn_after) in query.iter() {
        if current_time >= despawn_after.despawn_time {
            crate::log(&format!("⚰️ Despawning entity {:?} (timeout)", entity));
            commands.entity(entity).try_despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knockback_follows_direction() {
        let knockback = knockback_impulse(Vec2::new(0.6, 0.8), 10.0, None);
        assert!((knockback - Vec3::new(6.0, 8.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_death_multiplier_only_on_horizontal() {
        let knockback = knockback_impulse(Vec2::new(0.6, 0.8), 10.0, Some(1.5));
        assert!((knockback - Vec3::new(9.0, 8.0, 0.0)).length() < 1e-5);

        let knockback = knockback_impulse(Vec2::new(-1.0, 0.0), 10.0, Some(1.5));
        assert_eq!(knockback, Vec3::new(-15.0, 0.0, 0.0));
    }
}
