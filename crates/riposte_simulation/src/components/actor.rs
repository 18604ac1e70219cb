//! Базовые компоненты бойцов: Combatant, Health, CombatWeight, Facing, Tint

use bevy::prelude::*;

use crate::components::Locomotion;

/// Боец (игрок или враг) — базовый компонент для всех кто бьёт или получает удары
///
/// Автоматически добавляет CombatWeight, Facing, Tint, Locomotion через Required Components.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
#[require(CombatWeight, Facing, Tint, Locomotion)]
pub struct Combatant;

/// Здоровье бойца
///
/// Инвариант: 0 ≤ current ≤ max, current монотонно убывает пока жив.
/// Dead — терминальное состояние, любой следующий урон — no-op.
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    pub vital: VitalState,
    /// Alpha спрайта (invincibility blink: 1.0 ↔ 0.4)
    pub alpha: f32,
    blink_elapsed: f32,
}

/// Alive → Invincible → Alive пока hp > 0; любое → Dead при hp ≤ 0.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub enum VitalState {
    Alive,
    Invincible { remaining: f32 },
    Dead,
}

/// Результат `Health::take_damage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Урон отклонён (invincible или уже мёртв), здоровье не изменилось
    Rejected,
    /// Урон применён, боец жив
    Wounded,
    /// Урон применён, боец перешёл в Dead
    Killed,
}

pub const BLINK_ALPHA: f32 = 0.4;

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            vital: VitalState::Alive,
            alpha: 1.0,
            blink_elapsed: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.vital, VitalState::Dead)
    }

    pub fn is_invincible(&self) -> bool {
        matches!(self.vital, VitalState::Invincible { .. })
    }

    /// Применить урон.
    ///
    /// `invincibility` — длительность i-frames после не-смертельного урона
    /// (0 = бойцу они не положены).
    pub fn take_damage(&mut self, amount: f32, invincibility: f32) -> DamageOutcome {
        if !matches!(self.vital, VitalState::Alive) {
            return DamageOutcome::Rejected;
        }

        self.current = (self.current - amount.max(0.0)).max(0.0);

        if self.current <= 0.0 {
            self.vital = VitalState::Dead;
            self.alpha = 1.0;
            return DamageOutcome::Killed;
        }

        if invincibility > 0.0 {
            self.vital = VitalState::Invincible {
                remaining: invincibility,
            };
            // Первый blink сразу при попадании
            self.alpha = BLINK_ALPHA;
            self.blink_elapsed = 0.0;
        }

        DamageOutcome::Wounded
    }

    /// Продвинуть invincibility/blink. Возвращает true когда i-frames закончились.
    pub fn tick(&mut self, delta: f32, blink_interval: f32) -> bool {
        let VitalState::Invincible { remaining } = self.vital else {
            return false;
        };

        let remaining = remaining - delta;

        if blink_interval > 0.0 {
            self.blink_elapsed += delta;
            while self.blink_elapsed >= blink_interval {
                self.blink_elapsed -= blink_interval;
                self.alpha = if self.alpha >= 1.0 { BLINK_ALPHA } else { 1.0 };
            }
        }

        if remaining <= 0.0 {
            self.vital = VitalState::Alive;
            self.alpha = 1.0;
            self.blink_elapsed = 0.0;
            return true;
        }

        self.vital = VitalState::Invincible { remaining };
        false
    }
}

/// Вес бойца для parry tie-break (больше = труднее отбросить)
///
/// Задаётся при конфигурации, в рантайме не меняется.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CombatWeight(pub f32);

pub const DEFAULT_WEIGHT: f32 = 50.0;

impl Default for CombatWeight {
    fn default() -> Self {
        Self(DEFAULT_WEIGHT)
    }
}

/// Light: 30-40 | Medium: 50-60 | Heavy: 70-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum WeightClass {
    Light,
    Medium,
    Heavy,
}

impl CombatWeight {
    pub fn class(&self) -> WeightClass {
        if self.0 < 45.0 {
            WeightClass::Light
        } else if self.0 < 65.0 {
            WeightClass::Medium
        } else {
            WeightClass::Heavy
        }
    }
}

/// Направление взгляда (+1 вправо, -1 влево)
///
/// Пишется sprite-flip коллаборатором, combat только читает.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Facing(f32);

impl Default for Facing {
    fn default() -> Self {
        Self::RIGHT
    }
}

impl Facing {
    pub const RIGHT: Facing = Facing(1.0);
    pub const LEFT: Facing = Facing(-1.0);

    /// `flip_x == true` означает спрайт смотрит влево
    pub fn from_flip_x(flip_x: bool) -> Self {
        if flip_x {
            Self::LEFT
        } else {
            Self::RIGHT
        }
    }

    pub fn sign(&self) -> f32 {
        self.0
    }
}

/// Визуальный tint бойца (рендер — внешний коллаборатор)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub enum Tint {
    #[default]
    Original,
    /// Telegraph flash
    Warning,
    /// Успешный parry
    ParryFlash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100.0);

        assert_eq!(health.take_damage(30.0, 0.0), DamageOutcome::Wounded);
        assert_eq!(health.current, 70.0);
        assert!(health.is_alive());

        assert_eq!(health.take_damage(100.0, 0.0), DamageOutcome::Killed);
        assert_eq!(health.current, 0.0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_dead_rejects_damage() {
        let mut health = Health::new(10.0);
        assert_eq!(health.take_damage(10.0, 2.0), DamageOutcome::Killed);

        assert_eq!(health.take_damage(5.0, 2.0), DamageOutcome::Rejected);
        assert_eq!(health.current, 0.0);
        assert_eq!(health.vital, VitalState::Dead);
    }

    #[test]
    fn test_invincibility_gates_damage() {
        let mut health = Health::new(100.0);
        health.take_damage(10.0, 2.0);
        assert!(health.is_invincible());
        assert_eq!(health.alpha, BLINK_ALPHA);

        // Второй удар во время i-frames игнорируется полностью
        assert_eq!(health.take_damage(10.0, 2.0), DamageOutcome::Rejected);
        assert_eq!(health.current, 90.0);
        assert_eq!(health.vital, VitalState::Invincible { remaining: 2.0 });
    }

    #[test]
    fn test_invincibility_expires_and_blinks() {
        let mut health = Health::new(100.0);
        health.take_damage(10.0, 0.5);

        assert!(!health.tick(0.1, 0.1));
        assert_eq!(health.alpha, 1.0);
        assert!(!health.tick(0.1, 0.1));
        assert_eq!(health.alpha, BLINK_ALPHA);

        assert!(health.tick(0.5, 0.1));
        assert!(!health.is_invincible());
        assert_eq!(health.alpha, 1.0);

        // Снова уязвим
        assert_eq!(health.take_damage(10.0, 0.5), DamageOutcome::Wounded);
        assert_eq!(health.current, 80.0);
    }

    #[test]
    fn test_weight_class() {
        assert_eq!(CombatWeight(30.0).class(), WeightClass::Light);
        assert_eq!(CombatWeight::default().class(), WeightClass::Medium);
        assert_eq!(CombatWeight(64.9).class(), WeightClass::Medium);
        assert_eq!(CombatWeight(70.0).class(), WeightClass::Heavy);
    }

    #[test]
    fn test_facing_from_flip() {
        assert_eq!(Facing::from_flip_x(true).sign(), -1.0);
        assert_eq!(Facing::from_flip_x(false).sign(), 1.0);
    }
}
