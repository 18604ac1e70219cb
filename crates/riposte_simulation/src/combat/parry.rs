//! Parry — защитное окно с weight-based tie-break
//!
//! # Тайминги
//!
//! Окно и cooldown считаются от одного timestamp активации:
//! - parrying: `[start, start + parry_window)`
//! - следующая активация: `now >= start + parry_cooldown` (cooldown ≥ window)
//!
//! # Резолюция
//!
//! `resolve_parry` — чистая функция (веса + активность окна в момент удара):
//! строго больший вес атакующего побеждает, ничья — за защитником.
//!
//! # Эффекты успеха
//!
//! - `HitStop`: `Time<Virtual>` замораживается на `freeze_duration` реального времени
//! - `ParryFlash`: tint защитника на `flash_duration` игрового времени
//! - knockback проигравшей стороне; отбитый атакующий получает `Stagger` (0.5s)

use bevy::prelude::*;

use crate::combat::events::ParryIntent;
use crate::components::{Locomotion, LocomotionHold, Tint};
use crate::config::ParryConfig;

/// Оглушение атакующего после отбитого удара (секунды)
pub const STUN_DURATION: f32 = 0.5;

/// Вертикальный bias knockback когда отбрасывает защитника
const DEFENDER_LIFT: f32 = 0.3;
/// Вертикальный bias knockback когда отбрасывает атакующего
const ATTACKER_LIFT: f32 = 0.2;
/// Защитник отлетает слабее атакующего
const DEFENDER_FORCE_SCALE: f32 = 0.5;

/// Сторона parry (кто выиграл / проиграл tie-break)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ParrySide {
    Attacker,
    Defender,
}

impl ParrySide {
    pub fn opponent(self) -> Self {
        match self {
            ParrySide::Attacker => ParrySide::Defender,
            ParrySide::Defender => ParrySide::Attacker,
        }
    }
}

/// Результат `tryIntercept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptResult {
    NotParried,
    /// Parry сработал, `winner` не получает knockback
    Parried { winner: ParrySide },
}

impl InterceptResult {
    /// Сторона которую отбрасывает (None если parry не сработал)
    pub fn loser(&self) -> Option<ParrySide> {
        match self {
            InterceptResult::NotParried => None,
            InterceptResult::Parried { winner } => Some(winner.opponent()),
        }
    }

    pub fn is_parried(&self) -> bool {
        matches!(self, InterceptResult::Parried { .. })
    }
}

/// Tie-break по весу.
///
/// `attacker_weight > defender_weight` → атакующий побеждает (защитника отбрасывает),
/// иначе (включая ничью) побеждает защитник.
pub fn resolve_parry(attacker_weight: f32, defender_weight: f32, parry_active: bool) -> InterceptResult {
    if !parry_active {
        return InterceptResult::NotParried;
    }

    let winner = if attacker_weight > defender_weight {
        ParrySide::Attacker
    } else {
        ParrySide::Defender
    };

    InterceptResult::Parried { winner }
}

/// Knockback impulse проигравшей стороне.
///
/// `attack_direction` — направление удара (от атакующего к защитнику).
/// Защитника толкает по удару, атакующего — назад; горизонталь берётся знаком,
/// плюс небольшой вертикальный bias, затем normalize × force.
pub fn parry_knockback(loser: ParrySide, attack_direction: Vec2, force: f32) -> Vec3 {
    let sign = if attack_direction.x < 0.0 { -1.0 } else { 1.0 };

    let impulse = match loser {
        ParrySide::Defender => {
            Vec2::new(sign, DEFENDER_LIFT).normalize() * force * DEFENDER_FORCE_SCALE
        }
        ParrySide::Attacker => Vec2::new(-sign, ATTACKER_LIFT).normalize() * force,
    };

    impulse.extend(0.0)
}

/// Parry окно защитника
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct ParryWindow {
    /// Timestamp последней активации (`Time<Fixed>` elapsed)
    last_activation: Option<f64>,
}

impl ParryWindow {
    pub fn last_activation(&self) -> Option<f64> {
        self.last_activation
    }

    /// `CanParry()`: cooldown от предыдущей активации истёк
    pub fn can_activate(&self, now: f64, config: &ParryConfig) -> bool {
        self.last_activation
            .is_none_or(|start| now >= start + config.parry_cooldown as f64)
    }

    /// `activate(now)`: no-op если cooldown не истёк. true при успехе.
    pub fn activate(&mut self, now: f64, config: &ParryConfig) -> bool {
        if !self.can_activate(now, config) {
            return false;
        }
        self.last_activation = Some(now);
        true
    }

    /// `IsParrying()`: `now ∈ [start, start + parry_window)`
    pub fn is_parrying(&self, now: f64, config: &ParryConfig) -> bool {
        self.last_activation
            .is_some_and(|start| now >= start && now < start + config.parry_window as f64)
    }

    /// Сколько ждать до следующей активации
    pub fn cooldown_remaining(&self, now: f64, config: &ParryConfig) -> f32 {
        self.last_activation
            .map(|start| (start + config.parry_cooldown as f64 - now).max(0.0) as f32)
            .unwrap_or(0.0)
    }

    /// `tryIntercept`: резолюция удара по активности окна в момент вызова
    pub fn try_intercept(
        &self,
        now: f64,
        config: &ParryConfig,
        attacker_weight: f32,
        defender_weight: f32,
    ) -> InterceptResult {
        resolve_parry(attacker_weight, defender_weight, self.is_parrying(now, config))
    }
}

/// Оглушение (Stun hold на locomotion)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Stagger {
    pub remaining: f32,
}

/// Tint защитника после успешного parry
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct ParryFlash {
    pub remaining: f32,
}

/// Hit-stop: глобальная пауза `Time<Virtual>`, отсчитывается в реальном времени
#[derive(Resource, Debug, Clone, Default)]
pub struct HitStop {
    remaining: Option<f32>,
    restore_speed: f32,
}

impl HitStop {
    pub fn is_active(&self) -> bool {
        self.remaining.is_some()
    }

    pub fn remaining(&self) -> Option<f32> {
        self.remaining
    }

    /// Заморозить виртуальное время. Повторный вызов во время freeze продлевает его,
    /// но не перезаписывает исходную скорость.
    pub fn start(&mut self, duration: f32, virtual_time: &mut Time<Virtual>) {
        if duration <= 0.0 {
            return;
        }
        match self.remaining {
            Some(remaining) => self.remaining = Some(remaining.max(duration)),
            None => {
                self.restore_speed = virtual_time.relative_speed();
                self.remaining = Some(duration);
                virtual_time.set_relative_speed(0.0);
            }
        }
    }

    /// Продвинуть на реальный `delta`. true когда freeze закончился на этом шаге.
    pub fn tick(&mut self, real_delta: f32, virtual_time: &mut Time<Virtual>) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };

        let remaining = remaining - real_delta;
        if remaining > 0.0 {
            self.remaining = Some(remaining);
            return false;
        }

        self.remaining = None;
        virtual_time.set_relative_speed(self.restore_speed);
        true
    }
}

/// Система: активация parry по input (input polling — снаружи)
pub fn start_parry(
    mut intents: EventReader<ParryIntent>,
    mut defenders: Query<(&mut ParryWindow, &ParryConfig)>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for intent in intents.read() {
        let Ok((mut window, config)) = defenders.get_mut(intent.defender) else {
            continue;
        };

        if window.activate(now, config) {
            crate::log(&format!(
                "🛡️ Parry active (entity: {:?}, window: {:.2}s)",
                intent.defender, config.parry_window
            ));
        }
    }
}

/// Система (PreUpdate): снять hit-stop по реальному времени
pub fn release_hit_stop(
    mut hit_stop: ResMut<HitStop>,
    mut virtual_time: ResMut<Time<Virtual>>,
    real_time: Res<Time<Real>>,
) {
    if !hit_stop.is_active() {
        return;
    }

    if hit_stop.tick(real_time.delta_secs(), &mut virtual_time) {
        crate::log("⏯️ Hit-stop released");
    }
}

/// Система: снять Stun hold когда оглушение закончилось
pub fn tick_staggers(
    mut commands: Commands,
    mut staggered: Query<(Entity, &mut Stagger, &mut Locomotion)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut stagger, mut locomotion) in staggered.iter_mut() {
        stagger.remaining -= delta;
        if stagger.remaining > 0.0 {
            continue;
        }

        locomotion.release(LocomotionHold::Stun);
        commands.entity(entity).remove::<Stagger>();
        crate::log(&format!("💫 Stagger ended (entity: {:?})", entity));
    }
}

/// Система: вернуть tint после parry flash
pub fn tick_parry_flashes(
    mut commands: Commands,
    mut flashing: Query<(Entity, &mut ParryFlash, &mut Tint)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut flash, mut tint) in flashing.iter_mut() {
        flash.remaining -= delta;
        if flash.remaining > 0.0 {
            continue;
        }

        if *tint == Tint::ParryFlash {
            *tint = Tint::Original;
        }
        commands.entity(entity).remove::<ParryFlash>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ParryConfig {
        ParryConfig {
            parry_window: 0.3,
            parry_cooldown: 1.0,
            ..ParryConfig::default()
        }
    }

    #[test]
    fn test_window_and_cooldown_share_start() {
        let config = config();
        let mut window = ParryWindow::default();
        assert!(window.can_activate(0.0, &config));
        assert!(!window.is_parrying(0.0, &config));

        assert!(window.activate(2.0, &config));
        assert!(window.is_parrying(2.0, &config));
        assert!(window.is_parrying(2.25, &config));
        assert!(!window.is_parrying(2.3, &config)); // полуоткрытый интервал

        // Окно закрыто, но cooldown ещё идёт от той же активации
        assert!(!window.can_activate(2.5, &config));
        assert!(!window.activate(2.5, &config));
        assert_eq!(window.last_activation(), Some(2.0));
        assert!((window.cooldown_remaining(2.5, &config) - 0.5).abs() < 1e-6);

        assert!(window.activate(3.0, &config));
        assert_eq!(window.cooldown_remaining(3.0, &config), 1.0);
    }

    #[test]
    fn test_resolve_parry_weights() {
        // Тяжёлый атакующий пробивает
        assert_eq!(
            resolve_parry(70.0, 50.0, true),
            InterceptResult::Parried { winner: ParrySide::Attacker }
        );
        assert_eq!(resolve_parry(70.0, 50.0, true).loser(), Some(ParrySide::Defender));

        // Лёгкий атакующий отлетает
        assert_eq!(resolve_parry(30.0, 50.0, true).loser(), Some(ParrySide::Attacker));

        // Ничья — за защитником
        assert_eq!(
            resolve_parry(50.0, 50.0, true),
            InterceptResult::Parried { winner: ParrySide::Defender }
        );

        assert_eq!(resolve_parry(70.0, 50.0, false), InterceptResult::NotParried);
        assert_eq!(InterceptResult::NotParried.loser(), None);
    }

    #[test]
    fn test_try_intercept_outside_window() {
        let config = config();
        let mut window = ParryWindow::default();
        window.activate(1.0, &config);

        assert!(window.try_intercept(1.1, &config, 30.0, 50.0).is_parried());
        assert!(!window.try_intercept(1.4, &config, 30.0, 50.0).is_parried());
    }

    #[test]
    fn test_parry_knockback_directions() {
        let attack_direction = Vec2::new(1.0, 0.0);

        let defender = parry_knockback(ParrySide::Defender, attack_direction, 15.0);
        assert!(defender.x > 0.0 && defender.y > 0.0);
        assert!((defender.length() - 7.5).abs() < 1e-4);

        let attacker = parry_knockback(ParrySide::Attacker, attack_direction, 15.0);
        assert!(attacker.x < 0.0 && attacker.y > 0.0);
        assert!((attacker.length() - 15.0).abs() < 1e-4);
        assert_eq!(attacker.z, 0.0);
    }

    #[test]
    fn test_hit_stop_restores_previous_speed() {
        let mut virtual_time = Time::<Virtual>::default();
        virtual_time.set_relative_speed(0.5);

        let mut hit_stop = HitStop::default();
        hit_stop.start(0.15, &mut virtual_time);
        assert!(hit_stop.is_active());
        assert_eq!(virtual_time.relative_speed(), 0.0);

        assert!(!hit_stop.tick(0.1, &mut virtual_time));
        assert_eq!(virtual_time.relative_speed(), 0.0);

        assert!(hit_stop.tick(0.1, &mut virtual_time));
        assert!(!hit_stop.is_active());
        assert_eq!(virtual_time.relative_speed(), 0.5);
    }
}
