//! Locomotion capability: on/off переключатель для внешнего контроллера движения
//!
//! Архитектура:
//! - Движение (chase, dash, jump) — внешний коллаборатор, читает `Locomotion::is_enabled`
//! - Combat системы держат holds: каждая система снимает только свой hold
//! - Enabled ⇔ нет ни одного hold

use bevy::prelude::*;

/// Причина по которой движение заблокировано.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum LocomotionHold {
    /// Атака от Telegraphing до конца последовательности
    Attack,
    /// Оглушение после отбитой атаки
    Stun,
    /// Короткая потеря контроля после прямого попадания
    Knockback,
    /// Смерть (не снимается)
    Death,
    /// `set_enabled(false)` от внешнего коллаборатора
    External,
}

impl LocomotionHold {
    fn bit(self) -> u8 {
        match self {
            LocomotionHold::Attack => 1 << 0,
            LocomotionHold::Stun => 1 << 1,
            LocomotionHold::Knockback => 1 << 2,
            LocomotionHold::Death => 1 << 3,
            LocomotionHold::External => 1 << 4,
        }
    }
}

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct Locomotion {
    holds: u8,
}

impl Locomotion {
    pub fn is_enabled(&self) -> bool {
        self.holds == 0
    }

    pub fn is_held(&self, hold: LocomotionHold) -> bool {
        self.holds & hold.bit() != 0
    }

    pub fn hold(&mut self, hold: LocomotionHold) {
        self.holds |= hold.bit();
    }

    pub fn release(&mut self, hold: LocomotionHold) {
        if hold == LocomotionHold::Death {
            return;
        }
        self.holds &= !hold.bit();
    }

    /// Интерфейс внешнего коллаборатора (`setEnabled`)
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.release(LocomotionHold::External);
        } else {
            self.hold(LocomotionHold::External);
        }
    }
}

/// Потеря контроля после knockback (remaining секунд)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct KnockbackLock {
    pub remaining: f32,
}
