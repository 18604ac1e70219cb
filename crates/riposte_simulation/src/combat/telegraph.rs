//! Telegraph — предупреждение перед атакой
//!
//! # Варианты
//!
//! - **Flash**: tint мигает Warning/Original `flash_count` раз, интервал `duration / (flash_count * 2)`
//! - **Windup**: windup animation trigger + ожидание `duration`
//! - **Indicator**: маркер в `position + offset` живёт `duration`, затем fade 0.15s и release
//! - **Combined**: Flash → Indicator → Windup строго последовательно, без перекрытия
//!
//! # Модель
//!
//! `TelegraphSession` — чистая state machine: `tick(delta)` продвигает фазы и
//! складывает `TelegraphEffect` в буфер. Система `advance_telegraphs` применяет
//! эффекты к миру (tint, indicator entity, animation trigger).
//!
//! `is_active()` true от старта сессии до тика на котором она завершилась.
//! Индикатор принадлежит сессии и освобождается на любом выходе (finish, cancel,
//! despawn владельца).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::events::AnimationTrigger;
use crate::config::TelegraphConfig;
use crate::components::Tint;

/// Fade маркера после основной фазы (секунды)
pub const INDICATOR_FADE_SECS: f32 = 0.15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum TelegraphVariant {
    #[default]
    Flash,
    Windup,
    Indicator,
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum TelegraphPhase {
    Idle,
    Flashing,
    WindingUp,
    Indicating,
    Combined,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
enum TelegraphStage {
    Flash,
    Indicator,
    Windup,
}

/// Side effect сессии, применяется системой
#[derive(Debug, Clone, PartialEq)]
pub enum TelegraphEffect {
    Tint(Tint),
    SpawnIndicator { offset: Vec2 },
    IndicatorAlpha(f32),
    ReleaseIndicator,
    Trigger(String),
}

/// Одна сессия telegraph (одна на атакующего)
#[derive(Debug, Clone, Reflect)]
pub struct TelegraphSession {
    pub variant: TelegraphVariant,
    pub phase: TelegraphPhase,
    /// Общее время с начала сессии
    pub elapsed: f32,
    /// Длительность одной фазы
    pub duration: f32,
    flash_count: u32,
    indicator_offset: Option<Vec2>,
    windup_trigger: String,
    stages: Vec<TelegraphStage>,
    stage_index: usize,
    stage_elapsed: f32,
    stage_started: bool,
    indicator_live: bool,
}

impl TelegraphSession {
    pub fn start(config: &TelegraphConfig) -> Self {
        let (phase, stages) = match config.variant {
            TelegraphVariant::Flash => (TelegraphPhase::Flashing, vec![TelegraphStage::Flash]),
            TelegraphVariant::Windup => (TelegraphPhase::WindingUp, vec![TelegraphStage::Windup]),
            TelegraphVariant::Indicator => {
                (TelegraphPhase::Indicating, vec![TelegraphStage::Indicator])
            }
            // Последовательно: предупреждение полностью видно до начала windup
            TelegraphVariant::Combined => (
                TelegraphPhase::Combined,
                vec![
                    TelegraphStage::Flash,
                    TelegraphStage::Indicator,
                    TelegraphStage::Windup,
                ],
            ),
        };

        Self {
            variant: config.variant,
            phase,
            elapsed: 0.0,
            duration: config.duration.max(0.0),
            flash_count: config.flash_count.max(1),
            indicator_offset: config.indicator_offset,
            windup_trigger: config.windup_trigger.clone(),
            stages,
            stage_index: 0,
            stage_elapsed: 0.0,
            stage_started: false,
            indicator_live: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == TelegraphPhase::Done
    }

    /// Сумма длительностей всех фаз
    pub fn total_duration(&self) -> f32 {
        self.stages.iter().map(|stage| self.stage_length(*stage)).sum()
    }

    fn stage_length(&self, stage: TelegraphStage) -> f32 {
        match stage {
            TelegraphStage::Flash | TelegraphStage::Windup => self.duration,
            TelegraphStage::Indicator if self.indicator_offset.is_some() => {
                self.duration + INDICATOR_FADE_SECS
            }
            TelegraphStage::Indicator => self.duration,
        }
    }

    /// Продвинуть сессию на `delta`. Остаток времени завершённой фазы переходит в следующую.
    ///
    /// Возвращает true на тике завершения (и на всех последующих).
    pub fn tick(&mut self, delta: f32, effects: &mut Vec<TelegraphEffect>) -> bool {
        if self.is_done() {
            return true;
        }

        let mut remaining = delta.max(0.0);

        loop {
            let Some(stage) = self.stages.get(self.stage_index).copied() else {
                self.phase = TelegraphPhase::Done;
                return true;
            };

            if !self.stage_started {
                self.stage_started = true;
                self.enter_stage(stage, effects);
            }

            let available = self.stage_length(stage) - self.stage_elapsed;
            if remaining < available {
                self.stage_elapsed += remaining;
                self.elapsed += remaining;
                self.update_stage(stage, effects);
                return false;
            }

            remaining -= available;
            self.elapsed += available;
            self.exit_stage(stage, effects);

            self.stage_index += 1;
            self.stage_elapsed = 0.0;
            self.stage_started = false;
        }
    }

    /// Прервать сессию: вернуть tint, освободить маркер. Completion эффектов нет.
    pub fn cancel(&mut self, effects: &mut Vec<TelegraphEffect>) {
        if self.is_done() {
            return;
        }

        if let Some(TelegraphStage::Flash) = self.stages.get(self.stage_index) {
            if self.stage_started {
                effects.push(TelegraphEffect::Tint(Tint::Original));
            }
        }
        if self.indicator_live {
            self.indicator_live = false;
            effects.push(TelegraphEffect::ReleaseIndicator);
        }

        self.phase = TelegraphPhase::Done;
    }

    fn enter_stage(&mut self, stage: TelegraphStage, effects: &mut Vec<TelegraphEffect>) {
        match stage {
            TelegraphStage::Flash => effects.push(TelegraphEffect::Tint(Tint::Warning)),
            TelegraphStage::Indicator => {
                if let Some(offset) = self.indicator_offset {
                    self.indicator_live = true;
                    effects.push(TelegraphEffect::SpawnIndicator { offset });
                }
            }
            TelegraphStage::Windup => {
                effects.push(TelegraphEffect::Trigger(self.windup_trigger.clone()))
            }
        }
    }

    fn update_stage(&self, stage: TelegraphStage, effects: &mut Vec<TelegraphEffect>) {
        match stage {
            TelegraphStage::Flash => {
                let interval = self.duration / (self.flash_count * 2) as f32;
                if interval <= 0.0 {
                    return;
                }
                let half_flashes = (self.stage_elapsed / interval).floor() as u32;
                let tint = if half_flashes % 2 == 0 {
                    Tint::Warning
                } else {
                    Tint::Original
                };
                effects.push(TelegraphEffect::Tint(tint));
            }
            TelegraphStage::Indicator => {
                if self.indicator_live && self.stage_elapsed > self.duration {
                    let t = (self.stage_elapsed - self.duration) / INDICATOR_FADE_SECS;
                    effects.push(TelegraphEffect::IndicatorAlpha((1.0 - t).clamp(0.0, 1.0)));
                }
            }
            TelegraphStage::Windup => {}
        }
    }

    fn exit_stage(&mut self, stage: TelegraphStage, effects: &mut Vec<TelegraphEffect>) {
        match stage {
            TelegraphStage::Flash => effects.push(TelegraphEffect::Tint(Tint::Original)),
            TelegraphStage::Indicator => {
                if self.indicator_live {
                    self.indicator_live = false;
                    effects.push(TelegraphEffect::ReleaseIndicator);
                }
            }
            TelegraphStage::Windup => {}
        }
    }
}

/// Telegraph controller атакующего (максимум одна активная сессия)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct TelegraphController {
    session: Option<TelegraphSession>,
    /// Entity маркера текущей сессии
    indicator: Option<Entity>,
}

impl TelegraphController {
    /// `runTelegraph`: стартует сессию. false если сессия уже идёт.
    pub fn run(&mut self, config: &TelegraphConfig) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(TelegraphSession::start(config));
        true
    }

    /// `IsTelegraphActive`
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|session| !session.is_done())
    }

    pub fn is_done(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.is_done())
    }

    pub fn phase(&self) -> TelegraphPhase {
        self.session
            .as_ref()
            .map(|session| session.phase)
            .unwrap_or(TelegraphPhase::Idle)
    }

    pub fn session(&self) -> Option<&TelegraphSession> {
        self.session.as_ref()
    }

    pub fn indicator(&self) -> Option<Entity> {
        self.indicator
    }

    /// Забрать завершённую сессию (controller → Idle)
    pub fn finish(&mut self) -> Option<TelegraphSession> {
        if self.is_done() {
            self.session.take()
        } else {
            None
        }
    }

    /// Прервать текущую сессию, controller → Idle. Эффекты отмены — в `effects`.
    pub fn cancel(&mut self, effects: &mut Vec<TelegraphEffect>) {
        if let Some(mut session) = self.session.take() {
            session.cancel(effects);
        }
    }

    fn tick(&mut self, delta: f32, effects: &mut Vec<TelegraphEffect>) {
        if let Some(session) = self.session.as_mut() {
            session.tick(delta, effects);
        }
    }
}

/// Маркер атаки (визуал — внешний коллаборатор)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct AttackIndicator {
    pub owner: Entity,
    pub alpha: f32,
}

/// Применить эффекты сессии к миру.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_telegraph_effects(
    owner: Entity,
    position: Vec3,
    effects: Vec<TelegraphEffect>,
    controller: &mut TelegraphController,
    mut tint: Option<&mut Tint>,
    commands: &mut Commands,
    triggers: &mut EventWriter<AnimationTrigger>,
    indicators: &mut Query<&mut AttackIndicator>,
) {
    for effect in effects {
        match effect {
            TelegraphEffect::Tint(new_tint) => {
                if let Some(tint) = tint.as_deref_mut() {
                    if *tint != new_tint {
                        *tint = new_tint;
                    }
                }
            }
            TelegraphEffect::SpawnIndicator { offset } => {
                let indicator = commands
                    .spawn((
                        AttackIndicator { owner, alpha: 1.0 },
                        Transform::from_translation(position + offset.extend(0.0)),
                    ))
                    .id();
                controller.indicator = Some(indicator);
            }
            TelegraphEffect::IndicatorAlpha(alpha) => {
                if let Some(mut indicator) =
                    controller.indicator.and_then(|entity| indicators.get_mut(entity).ok())
                {
                    indicator.alpha = alpha;
                }
            }
            TelegraphEffect::ReleaseIndicator => {
                if let Some(indicator) = controller.indicator.take() {
                    if let Ok(mut entity) = commands.get_entity(indicator) {
                        entity.try_despawn();
                    }
                }
            }
            TelegraphEffect::Trigger(name) => {
                triggers.write(AnimationTrigger {
                    entity: owner,
                    name,
                });
            }
        }
    }
}

/// Система: продвинуть активные telegraph сессии
pub fn advance_telegraphs(
    mut commands: Commands,
    mut controllers: Query<(Entity, &Transform, &mut TelegraphController, Option<&mut Tint>)>,
    mut indicators: Query<&mut AttackIndicator>,
    mut triggers: EventWriter<AnimationTrigger>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, transform, mut controller, mut tint) in controllers.iter_mut() {
        if !controller.is_active() {
            continue;
        }

        let mut effects = Vec::new();
        controller.tick(delta, &mut effects);

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

        if controller.is_done() {
            crate::log(&format!(
                "📣 Telegraph done (entity: {:?}, phase: {:?})",
                entity,
                controller.phase()
            ));
        }
    }
}

/// Система: удалить маркеры без владельца (владелец despawned или сессия сменилась)
pub fn release_orphaned_indicators(
    mut commands: Commands,
    indicators: Query<(Entity, &AttackIndicator)>,
    owners: Query<&TelegraphController>,
) {
    for (entity, indicator) in indicators.iter() {
        let owned = owners
            .get(indicator.owner)
            .map(|controller| controller.indicator() == Some(entity))
            .unwrap_or(false);

        if !owned {
            commands.entity(entity).try_despawn();
        }
    }
}
