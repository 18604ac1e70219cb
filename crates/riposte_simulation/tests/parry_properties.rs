//! Property-based тесты parry
//!
//! Инварианты:
//! 1. Резолюция — чистая функция (attacker_weight, defender_weight, active)
//! 2. Строго больший вес атакующего побеждает, ничья — за защитником
//! 3. Окно и cooldown считаются от одного timestamp активации
//! 4. Knockback: горизонталь по знаку удара, вертикальный bias вверх, длина = сила

use bevy::math::Vec2;
use proptest::prelude::*;
use riposte_simulation::combat::parry::parry_knockback;
use riposte_simulation::combat::{resolve_parry, InterceptResult, ParrySide, ParryWindow};
use riposte_simulation::ParryConfig;

fn weight_strategy() -> impl Strategy<Value = f32> {
    0.0f32..200.0f32
}

// cooldown всегда ≥ window (валидный конфиг)
fn parry_config_strategy() -> impl Strategy<Value = ParryConfig> {
    (0.05f32..1.0f32, 0.0f32..2.0f32).prop_map(|(window, extra)| ParryConfig {
        parry_window: window,
        parry_cooldown: window + extra,
        ..ParryConfig::default()
    })
}

proptest! {
    #[test]
    fn prop_inactive_parry_never_intercepts(
        attacker in weight_strategy(),
        defender in weight_strategy(),
    ) {
        prop_assert_eq!(resolve_parry(attacker, defender, false), InterceptResult::NotParried);
    }

    #[test]
    fn prop_strictly_heavier_attacker_wins(
        attacker in weight_strategy(),
        defender in weight_strategy(),
    ) {
        let loser = resolve_parry(attacker, defender, true).loser();

        if attacker > defender {
            prop_assert_eq!(loser, Some(ParrySide::Defender));
        } else {
            prop_assert_eq!(loser, Some(ParrySide::Attacker));
        }
    }

    #[test]
    fn prop_equal_weights_favor_defender(weight in weight_strategy()) {
        prop_assert_eq!(
            resolve_parry(weight, weight, true),
            InterceptResult::Parried { winner: ParrySide::Defender }
        );
    }

    #[test]
    fn prop_window_and_cooldown_share_start(
        config in parry_config_strategy(),
        start in 0.0f64..1000.0f64,
        offset in 0.0f64..4.0f64,
    ) {
        let window_end = config.parry_window as f64;
        let cooldown_end = config.parry_cooldown as f64;
        // Границы проверяются unit тестами, тут — вне float шума
        prop_assume!((offset - window_end).abs() > 1e-6);
        prop_assume!((offset - cooldown_end).abs() > 1e-6);

        let mut window = ParryWindow::default();
        prop_assert!(window.activate(start, &config));

        let now = start + offset;
        prop_assert_eq!(window.is_parrying(now, &config), offset < window_end);
        prop_assert_eq!(window.can_activate(now, &config), offset > cooldown_end);

        // Окно всегда закрывается не позже cooldown
        if window.can_activate(now, &config) {
            prop_assert!(!window.is_parrying(now, &config));
        }
    }

    #[test]
    fn prop_failed_activation_keeps_original_start(
        config in parry_config_strategy(),
        start in 0.0f64..1000.0f64,
        fraction in 0.0f64..0.99f64,
    ) {
        let mut window = ParryWindow::default();
        window.activate(start, &config);

        let retry = start + config.parry_cooldown as f64 * fraction;
        prop_assume!(retry < start + config.parry_cooldown as f64);

        prop_assert!(!window.activate(retry, &config));
        prop_assert_eq!(window.last_activation(), Some(start));
    }

    #[test]
    fn prop_knockback_follows_attack_sign(
        x in -10.0f32..10.0f32,
        y in -10.0f32..10.0f32,
        force in 0.1f32..50.0f32,
    ) {
        let direction = Vec2::new(x, y);
        let sign = if x < 0.0 { -1.0 } else { 1.0 };

        let defender = parry_knockback(ParrySide::Defender, direction, force);
        prop_assert_eq!(defender.x.signum(), sign);
        prop_assert!(defender.y > 0.0);
        prop_assert!((defender.length() - force * 0.5).abs() < 1e-3);

        let attacker = parry_knockback(ParrySide::Attacker, direction, force);
        prop_assert_eq!(attacker.x.signum(), -sign);
        prop_assert!(attacker.y > 0.0);
        prop_assert!((attacker.length() - force).abs() < 1e-3);
    }
}
