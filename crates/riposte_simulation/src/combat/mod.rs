//! Combat system module (timing + parry resolution)
//!
//! ECS ответственность:
//! - Attack sequencing: telegraph → windup → impact → cooldown
//! - Parry window + weight tie-break, hit-stop
//! - Damage/knockback resolution, invincibility, death
//!
//! Внешние коллабораторы (через events/components):
//! - Locomotion: читает `Locomotion::is_enabled`
//! - Animation: `AnimationTrigger` → clip, `ImpactSignal` ← animation event
//! - Rendering: `Tint`, `Health::alpha`, `AttackIndicator`
//! - Input: `ParryIntent`

use bevy::prelude::*;

pub mod damage;
pub mod events;
pub mod hitbox;
pub mod parry;
pub mod sequencer;
pub mod telegraph;


// Re-export основных типов
pub use damage::{Dead, DespawnAfter};
pub use events::{
    AnimationTrigger, AttackImpact, DamageDealt, EntityDied, ImpactSignal, ParryIntent,
    ParrySuccess,
};
pub use hitbox::{HitboxRegion, Hurtbox, ENEMY_LAYER, PLAYER_LAYER};
pub use parry::{
    resolve_parry, HitStop, InterceptResult, ParryFlash, ParrySide, ParryWindow, Stagger,
    STUN_DURATION,
};
pub use sequencer::{AttackSequencer, SequencerState};
pub use telegraph::{
    AttackIndicator, TelegraphController, TelegraphPhase, TelegraphVariant, INDICATOR_FADE_SECS,
};

use crate::config::ClipLengths;

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate (60Hz).
///
/// Порядок выполнения (один тик):
/// 1. tick_* — invincibility, stagger, knockback lock, parry flash
///    (таймер выставленный в тике начинает убывать со следующего)
/// 2. acquire_attack_targets — выбор ближайшей цели
/// 3. start_parry — ParryIntent → окно защиты
/// 4. detect_attack_opportunities — Attack hold + старт telegraph
/// 5. advance_telegraphs — фазы telegraph
/// 6. advance_attack_sequences + relay_direct_impacts — windup / impact
/// 7. resolve_attack_impacts — parry / damage / death
/// 8. finish_attack_sequences — cooldown, снять Attack hold
/// 9. abort_dead_sequences, release_orphaned_indicators, despawn_after_timeout
///
/// Hit-stop снимается в PreUpdate по `Time<Real>` (FixedUpdate во время freeze стоит).
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<AnimationTrigger>()
            .add_event::<ImpactSignal>()
            .add_event::<AttackImpact>()
            .add_event::<ParryIntent>()
            .add_event::<ParrySuccess>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>();

        app.init_resource::<ClipLengths>()
            .init_resource::<HitStop>();

        app.add_systems(PreUpdate, parry::release_hit_stop);

        // Регистрация систем в FixedUpdate
        app.add_systems(
            FixedUpdate,
            (
                // Фаза 1: таймеры
                damage::tick_vitals,
                damage::tick_knockback_locks,
                parry::tick_staggers,
                parry::tick_parry_flashes,
                // Фаза 2: цели и защита
                hitbox::acquire_attack_targets,
                parry::start_parry,
                // Фаза 3: последовательность атаки до удара
                sequencer::detect_attack_opportunities,
                telegraph::advance_telegraphs,
                sequencer::advance_attack_sequences,
                sequencer::relay_direct_impacts,
                // Фаза 4: удар (синхронно, до cooldown)
                damage::resolve_attack_impacts,
                sequencer::finish_attack_sequences,
                // Фаза 5: смерть и уборка
                sequencer::abort_dead_sequences,
                telegraph::release_orphaned_indicators,
                damage::despawn_after_timeout,
            )
                .chain(), // Последовательное выполнение
        );
    }
}
