//! Combat события
//!
//! Внешние коллабораторы → ECS:
//! - `ImpactSignal`: animation event в момент удара (`onImpact()`)
//! - `ParryIntent`: игрок нажал parry (input polling — снаружи)
//!
//! ECS → внешние коллабораторы:
//! - `AnimationTrigger`: fire-and-forget trigger по имени
//! - `DamageDealt`, `ParrySuccess`, `EntityDied`: UI/звук/эффекты
//!
//! Внутри тика:
//! - `AttackImpact`: sequencer/relay → resolver (один удар, синхронно в том же тике)

use bevy::prelude::*;

use crate::combat::parry::ParrySide;

/// Animation trigger (fire-and-forget)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AnimationTrigger {
    pub entity: Entity,
    pub name: String,
}

/// Animation collaborator сообщает момент удара
///
/// `strength` — множитель урона (номер удара в комбо у игрока, 1.0 у врагов).
#[derive(Event, Debug, Clone, Copy)]
pub struct ImpactSignal {
    pub attacker: Entity,
    pub strength: f32,
}

impl ImpactSignal {
    pub fn new(attacker: Entity) -> Self {
        Self {
            attacker,
            strength: 1.0,
        }
    }
}

/// Удар: оценить hitbox атакующего против целей (ровно один тик)
#[derive(Event, Debug, Clone, Copy)]
pub struct AttackImpact {
    pub attacker: Entity,
    pub damage: f32,
}

/// Попытка parry (защитник нажал кнопку)
#[derive(Event, Debug, Clone, Copy)]
pub struct ParryIntent {
    pub defender: Entity,
}

/// Parry перехватил удар
#[derive(Event, Debug, Clone, Copy)]
pub struct ParrySuccess {
    pub attacker: Entity,
    pub defender: Entity,
    /// Кого отбросило по результатам сравнения весов
    pub loser: ParrySide,
}

/// Урон нанесён
#[derive(Event, Debug, Clone, Copy)]
pub struct DamageDealt {
    pub attacker: Entity,
    pub target: Entity,
    pub damage: f32,
    pub knockback: Vec3,
    pub target_died: bool,
}

/// Entity умер (health <= 0)
#[derive(Event, Debug, Clone, Copy)]
pub struct EntityDied {
    pub entity: Entity,
    pub killer: Option<Entity>,
}
