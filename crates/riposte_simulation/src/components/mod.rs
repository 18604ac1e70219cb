//! ECS Components для бойцов
//!
//! Организация по доменам:
//! - actor: базовые характеристики (Combatant, Health, CombatWeight, Facing, Tint)
//! - movement: locomotion capability (Locomotion, LocomotionHold, KnockbackLock)

pub mod actor;
pub mod movement;

// Re-exports для удобного импорта
pub use actor::*;
pub use movement::*;
