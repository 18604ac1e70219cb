//! Attack sequencer — state machine атаки
//!
//! ```text
//! Idle → Telegraphing → Winding → AwaitingImpact → Cooldown → Idle
//! ```
//!
//! - `Idle → Telegraphing`: цель в `attack_range`, cooldown от прошлой атаки истёк.
//!   Locomotion получает Attack hold до старта telegraph сессии.
//! - `Telegraphing → Winding`: telegraph Done → animation trigger удара.
//! - `Winding → AwaitingImpact`: `ImpactSignal` от анимации или fallback таймаут
//!   (`ClipLengths::estimated_clip_length`) → `AttackImpact` для resolver'а.
//! - `AwaitingImpact → Cooldown → Idle`: в том же тике после resolver'а,
//!   `last_attack_end = now`, Attack hold снимается.
//!
//! Cooldown сам по себе не ждёт: время проверяет guard `Idle → Telegraphing`.
//! Мёртвый атакующий бросает последовательность без cooldown и без снятия hold.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::combat::events::{AnimationTrigger, AttackImpact, ImpactSignal};
use crate::combat::telegraph::{apply_telegraph_effects, AttackIndicator, TelegraphController};
use crate::components::{Health, Locomotion, LocomotionHold, Tint};
use crate::config::{AttackConfig, ClipLengths, TelegraphConfig};

/// Сумма f32 delta'ов недобирает до timeout на ~1e-6
const WINDUP_TIMEOUT_EPSILON: f32 = 1e-4;

/// Fallback таймаут windup'а истёк (тик в тик с длиной клипа)
fn windup_expired(elapsed: f32, timeout: f32) -> bool {
    elapsed + WINDUP_TIMEOUT_EPSILON >= timeout
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub enum SequencerState {
    #[default]
    Idle,
    Telegraphing,
    /// Ждём impact callback; `timeout` — fallback длина клипа
    Winding { elapsed: f32, timeout: f32 },
    AwaitingImpact,
    Cooldown,
}

/// Последовательность атаки (одна на атакующего)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct AttackSequencer {
    pub state: SequencerState,
    /// Текущая цель (выбирается `acquire_attack_targets`)
    pub target: Option<Entity>,
    /// Timestamp входа в Cooldown последней атаки (`Time<Fixed>` elapsed)
    last_attack_end: Option<f64>,
}

impl AttackSequencer {
    pub fn last_attack_end(&self) -> Option<f64> {
        self.last_attack_end
    }

    pub fn is_idle(&self) -> bool {
        self.state == SequencerState::Idle
    }

    pub fn is_mid_sequence(&self) -> bool {
        !self.is_idle()
    }

    /// Cooldown от прошлой атаки истёк
    pub fn cooldown_ready(&self, now: f64, config: &AttackConfig) -> bool {
        self.last_attack_end
            .is_none_or(|end| now >= end + config.attack_cooldown as f64)
    }

    /// Guard `Idle → Telegraphing`
    pub fn can_start(&self, now: f64, distance: f32, config: &AttackConfig) -> bool {
        self.is_idle() && distance <= config.attack_range && self.cooldown_ready(now, config)
    }

    /// `AwaitingImpact → Cooldown → Idle`. false если последовательность не ждала удар.
    pub fn complete(&mut self, now: f64) -> bool {
        if self.state != SequencerState::AwaitingImpact {
            return false;
        }
        self.state = SequencerState::Cooldown;
        self.last_attack_end = Some(now);
        self.state = SequencerState::Idle;
        true
    }

    /// Бросить последовательность: Idle без записи cooldown
    pub fn abort(&mut self) {
        self.state = SequencerState::Idle;
    }
}

/// Система: старт атаки когда цель в досягаемости
pub fn detect_attack_opportunities(
    mut attackers: Query<(
        Entity,
        &Transform,
        &AttackConfig,
        &TelegraphConfig,
        &mut AttackSequencer,
        &mut TelegraphController,
        &mut Locomotion,
        Option<&Health>,
    )>,
    bodies: Query<&Transform>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for (entity, transform, config, telegraph, mut sequencer, mut controller, mut locomotion, health) in
        attackers.iter_mut()
    {
        if health.is_some_and(Health::is_dead) {
            continue;
        }

        // Stale target → просто нет атаки
        let Some(target) = sequencer.target else {
            continue;
        };
        let Ok(target_transform) = bodies.get(target) else {
            continue;
        };

        let distance = transform
            .translation
            .truncate()
            .distance(target_transform.translation.truncate());

        if !sequencer.can_start(now, distance, config) {
            continue;
        }

        // Сессия предыдущей атаки ещё не отпущена — guard не пускает
        if !controller.run(telegraph) {
            continue;
        }

        // Hold до первой фазы telegraph (advance_telegraphs идёт следом в цепочке)
        locomotion.hold(LocomotionHold::Attack);
        sequencer.state = SequencerState::Telegraphing;

        crate::log(&format!(
            "⚔️ Attack sequence started (attacker: {:?}, target: {:?}, distance: {:.2}, telegraph: {:?})",
            entity, target, distance, telegraph.variant
        ));
    }
}

/// Система: Telegraphing → Winding → AwaitingImpact
pub fn advance_attack_sequences(
    mut attackers: Query<(Entity, &AttackConfig, &mut AttackSequencer, &mut TelegraphController)>,
    mut signals: EventReader<ImpactSignal>,
    mut triggers: EventWriter<AnimationTrigger>,
    mut impacts: EventWriter<AttackImpact>,
    clips: Res<ClipLengths>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let signalled: HashSet<Entity> = signals.read().map(|signal| signal.attacker).collect();

    for (entity, config, mut sequencer, mut controller) in attackers.iter_mut() {
        match sequencer.state {
            SequencerState::Telegraphing => {
                if controller.is_active() {
                    continue;
                }

                controller.finish();
                triggers.write(AnimationTrigger {
                    entity,
                    name: config.attack_trigger.clone(),
                });

                let timeout =
                    clips.estimated_clip_length(&config.attack_trigger, config.fallback_clip_length);
                sequencer.state = SequencerState::Winding {
                    elapsed: 0.0,
                    timeout,
                };

                crate::log(&format!(
                    "🌀 Winding (attacker: {:?}, trigger: {}, timeout: {:.2}s)",
                    entity, config.attack_trigger, timeout
                ));
            }
            SequencerState::Winding { elapsed, timeout } => {
                let elapsed = elapsed + delta;
                let impact_signalled = signalled.contains(&entity);

                if !impact_signalled && !windup_expired(elapsed, timeout) {
                    sequencer.state = SequencerState::Winding { elapsed, timeout };
                    continue;
                }

                if !impact_signalled {
                    crate::log(&format!(
                        "⏱️ No impact callback, fallback after {:.2}s (attacker: {:?})",
                        timeout, entity
                    ));
                }

                sequencer.state = SequencerState::AwaitingImpact;
                impacts.write(AttackImpact {
                    attacker: entity,
                    damage: config.attack_damage,
                });
            }
            SequencerState::Idle | SequencerState::AwaitingImpact | SequencerState::Cooldown => {}
        }
    }
}

/// Система: после resolver'а — Cooldown, Idle, снять Attack hold
///
/// Атакующий, убитый в том же тике, не завершает последовательность:
/// ею займётся `abort_dead_sequences` (без cooldown и re-enable).
pub fn finish_attack_sequences(
    mut attackers: Query<(Entity, &mut AttackSequencer, &mut Locomotion, Option<&Health>)>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for (entity, mut sequencer, mut locomotion, health) in attackers.iter_mut() {
        if health.is_some_and(Health::is_dead) {
            continue;
        }
        if !sequencer.complete(now) {
            continue;
        }

        locomotion.release(LocomotionHold::Attack);

        crate::log(&format!(
            "🔁 Attack sequence finished, cooldown from {:.2}s (attacker: {:?})",
            now, entity
        ));
    }
}

/// Система: мёртвый атакующий бросает последовательность
///
/// Telegraph отменяется (tint возвращается, маркер освобождается), cooldown не
/// пишется, Attack hold не снимается.
pub fn abort_dead_sequences(
    mut commands: Commands,
    mut attackers: Query<(
        Entity,
        &Transform,
        &Health,
        &mut AttackSequencer,
        &mut TelegraphController,
        Option<&mut Tint>,
    )>,
    mut indicators: Query<&mut AttackIndicator>,
    mut triggers: EventWriter<AnimationTrigger>,
) {
    for (entity, transform, health, mut sequencer, mut controller, mut tint) in attackers.iter_mut() {
        if !health.is_dead() {
            continue;
        }
        if sequencer.is_idle() && controller.session().is_none() {
            continue;
        }

        let mut effects = Vec::new();
        controller.cancel(&mut effects);
        apply_telegraph_effects(
            entity,
            transform.translation,
            effects,
            &mut controller,
            tint.as_deref_mut(),
            &mut commands,
            &mut triggers,
            &mut indicators,
        );

        crate::log(&format!(
            "✖️ Attack sequence aborted in {:?} (attacker {:?} died)",
            sequencer.state, entity
        ));
        sequencer.abort();
    }
}

/// Система: удары без sequencer'а (игрок) — `ImpactSignal` сразу в `AttackImpact`
///
/// Урон = `attack_damage × strength` (множитель комбо).
pub fn relay_direct_impacts(
    mut signals: EventReader<ImpactSignal>,
    mut impacts: EventWriter<AttackImpact>,
    attackers: Query<(&AttackConfig, Option<&Health>), Without<AttackSequencer>>,
) {
    for signal in signals.read() {
        let Ok((config, health)) = attackers.get(signal.attacker) else {
            continue;
        };
        if health.is_some_and(Health::is_dead) {
            continue;
        }

        impacts.write(AttackImpact {
            attacker: signal.attacker,
            damage: config.attack_damage * signal.strength,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AttackConfig {
        AttackConfig {
            attack_range: 1.5,
            attack_cooldown: 1.0,
            ..AttackConfig::default()
        }
    }

    #[test]
    fn test_can_start_guards() {
        let config = config();
        let mut sequencer = AttackSequencer::default();

        assert!(sequencer.can_start(0.0, 1.0, &config));
        assert!(sequencer.can_start(0.0, 1.5, &config));
        assert!(!sequencer.can_start(0.0, 1.6, &config));

        // Mid-sequence — повторный вход недостижим
        sequencer.state = SequencerState::Telegraphing;
        assert!(!sequencer.can_start(0.0, 1.0, &config));
    }

    #[test]
    fn test_cooldown_measured_from_sequence_end() {
        let config = config();
        let mut sequencer = AttackSequencer {
            state: SequencerState::AwaitingImpact,
            ..AttackSequencer::default()
        };

        assert!(sequencer.complete(5.0));
        assert!(sequencer.is_idle());
        assert_eq!(sequencer.last_attack_end(), Some(5.0));

        assert!(!sequencer.can_start(5.5, 1.0, &config));
        assert!(!sequencer.can_start(5.99, 1.0, &config));
        assert!(sequencer.can_start(6.0, 1.0, &config));
    }

    #[test]
    fn test_complete_only_from_awaiting_impact() {
        let mut sequencer = AttackSequencer {
            state: SequencerState::Winding {
                elapsed: 0.1,
                timeout: 0.5,
            },
            ..AttackSequencer::default()
        };

        assert!(!sequencer.complete(1.0));
        assert_eq!(sequencer.last_attack_end(), None);
    }

    #[test]
    fn test_windup_timeout_fires_on_exact_tick() {
        let delta = 1.0f32 / 60.0;
        let mut elapsed = 0.0f32;
        for _ in 0..29 {
            elapsed += delta;
        }
        assert!(!windup_expired(elapsed, 0.5));

        elapsed += delta;
        assert!(windup_expired(elapsed, 0.5));
        assert!(windup_expired(0.6, 0.5));
    }

    #[test]
    fn test_abort_skips_cooldown() {
        let mut sequencer = AttackSequencer {
            state: SequencerState::Telegraphing,
            ..AttackSequencer::default()
        };

        sequencer.abort();
        assert!(sequencer.is_idle());
        assert_eq!(sequencer.last_attack_end(), None);
    }
}
