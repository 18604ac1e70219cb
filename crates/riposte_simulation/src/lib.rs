//! Riposte Simulation Core
//!
//! ECS-симуляция ближнего боя на Bevy 0.16: тайминги атаки и parry.
//!
//! - Attack sequencer: telegraph → windup → impact → cooldown
//! - Parry window: weight-based tie-break, hit-stop, stagger
//! - Damage resolver: knockback, invincibility, смерть
//!
//! Рендер, анимации, движение и input — внешние коллабораторы:
//! общаются через events (`AnimationTrigger`, `ImpactSignal`, `ParryIntent`)
//! и компоненты (`Locomotion`, `Tint`, `Health::alpha`).

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

// Публичные модули
pub mod combat;
pub mod components;
pub mod config;
pub mod error;
pub mod logger;

// Re-export базовых компонентов для удобства
pub use combat::{
    AnimationTrigger, AttackSequencer, CombatPlugin, DamageDealt, Dead, EntityDied, ImpactSignal,
    ParryIntent, ParrySuccess, ParryWindow, SequencerState, TelegraphController,
};
pub use components::*;
pub use config::{AttackConfig, ClipLengths, CombatProfile, HealthConfig, ParryConfig, TelegraphConfig};
pub use error::ConfigError;
pub use logger::{init_logger, log, log_error, log_info, log_warning};

/// Частота simulation tick
pub const TICK_HZ: f64 = 60.0;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(TICK_HZ))
            .add_plugins(CombatPlugin);
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Каждый `app.update()` продвигает время ровно на один fixed tick
/// (первый update — нулевой delta, FixedUpdate в нём не запускается).
pub fn create_headless_app() -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(
            std::time::Duration::from_secs_f64(1.0 / TICK_HZ),
        ))
        .add_plugins(SimulationPlugin);

    app
}
