//! Статическая конфигурация бойцов
//!
//! Все значения задаются до старта симуляции и дальше не меняются:
//! combat системы только читают config компоненты.
//!
//! Источники:
//! - `CombatProfile::grunt() / brute() / player()` — встроенные пресеты
//! - `CombatProfile::load(path)` — JSON профиль (serde_json)
//! - `ClipLengths::from_manifest_json` — длины анимаций для fallback таймаута удара

use std::collections::HashMap;
use std::path::Path;

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionGroups, ExternalImpulse, Group, Velocity};
use serde::{Deserialize, Serialize};

use crate::combat::hitbox::{Hurtbox, ENEMY_LAYER, PLAYER_LAYER};
use crate::combat::parry::ParryWindow;
use crate::combat::sequencer::AttackSequencer;
use crate::combat::telegraph::{TelegraphController, TelegraphVariant};
use crate::components::{CombatWeight, Combatant, Health};
use crate::error::ConfigError;

/// Параметры атаки (hitbox, урон, cooldown)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct AttackConfig {
    pub attack_damage: f32,
    /// Дистанция с которой начинается последовательность атаки
    pub attack_range: f32,
    /// Cooldown между концом одной атаки и началом следующей (секунды)
    pub attack_cooldown: f32,
    /// Полные размеры hitbox (не half-extents)
    pub hitbox_size: Vec2,
    /// Offset hitbox от позиции атакующего, x зеркалится по Facing
    pub hitbox_offset: Vec2,
    /// Битовая маска слоёв по которым бьёт атака (rapier `Group` bits)
    pub target_layers: u32,
    /// Animation trigger удара
    pub attack_trigger: String,
    /// Fallback длина клипа удара если `ClipLengths` не знает trigger
    pub fallback_clip_length: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            attack_damage: 10.0,
            attack_range: 1.5,
            attack_cooldown: 1.5,
            hitbox_size: Vec2::new(1.0, 1.0),
            hitbox_offset: Vec2::new(1.0, 0.0),
            target_layers: PLAYER_LAYER.bits(),
            attack_trigger: "Attack1".into(),
            fallback_clip_length: 0.5,
        }
    }
}

impl AttackConfig {
    pub fn target_group(&self) -> Group {
        Group::from_bits_truncate(self.target_layers)
    }

    pub fn half_extents(&self) -> Vec2 {
        self.hitbox_size * 0.5
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("attack.attack_damage", self.attack_damage)?;
        non_negative("attack.attack_range", self.attack_range)?;
        non_negative("attack.attack_cooldown", self.attack_cooldown)?;
        non_negative("attack.fallback_clip_length", self.fallback_clip_length)?;
        if self.hitbox_size.x < 0.0 || self.hitbox_size.y < 0.0 {
            return Err(ConfigError::invalid("attack.hitbox_size", "must be non-negative"));
        }
        if self.target_layers == 0 {
            return Err(ConfigError::invalid("attack.target_layers", "empty layer mask hits nothing"));
        }
        Ok(())
    }
}

/// Параметры telegraph (предупреждение перед атакой)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct TelegraphConfig {
    pub variant: TelegraphVariant,
    /// Длительность одной фазы (секунды)
    pub duration: f32,
    pub flash_count: u32,
    pub windup_trigger: String,
    /// Offset маркера от позиции атакующего (None — маркера нет, фаза только ждёт)
    pub indicator_offset: Option<Vec2>,
}

impl Default for TelegraphConfig {
    fn default() -> Self {
        Self {
            variant: TelegraphVariant::Flash,
            duration: 0.5,
            flash_count: 3,
            windup_trigger: "windup".into(),
            indicator_offset: Some(Vec2::new(0.5, 0.5)),
        }
    }
}

impl TelegraphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("telegraph.duration", self.duration)?;
        if self.flash_count == 0 {
            return Err(ConfigError::invalid("telegraph.flash_count", "must be at least 1"));
        }
        Ok(())
    }
}

/// Параметры parry (окно, cooldown, эффекты)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ParryConfig {
    /// Сколько parry активен после нажатия (секунды)
    pub parry_window: f32,
    /// Cooldown от момента активации (всегда ≥ parry_window)
    pub parry_cooldown: f32,
    /// Hit-stop в реальном времени
    pub freeze_duration: f32,
    /// Parry flash после hit-stop (scaled time)
    pub flash_duration: f32,
    pub knockback_force: f32,
}

impl Default for ParryConfig {
    fn default() -> Self {
        Self {
            parry_window: 0.3,
            parry_cooldown: 1.0,
            freeze_duration: 0.15,
            flash_duration: 0.2,
            knockback_force: 15.0,
        }
    }
}

impl ParryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("parry.parry_window", self.parry_window)?;
        non_negative("parry.freeze_duration", self.freeze_duration)?;
        non_negative("parry.flash_duration", self.flash_duration)?;
        non_negative("parry.knockback_force", self.knockback_force)?;
        if self.parry_cooldown < self.parry_window {
            return Err(ConfigError::invalid(
                "parry.parry_cooldown",
                format!(
                    "cooldown {:.3}s shorter than window {:.3}s",
                    self.parry_cooldown, self.parry_window
                ),
            ));
        }
        Ok(())
    }
}

/// Параметры здоровья и реакции на удар
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct HealthConfig {
    pub max_health: f32,
    /// I-frames после не-смертельного урона (0 = нет)
    pub invincibility_duration: f32,
    pub blink_interval: f32,
    pub knockback_force: f32,
    /// Потеря контроля после knockback
    pub knockback_lock: f32,
    /// Множитель горизонтального knockback при смерти
    pub death_knockback_multiplier: f32,
    /// Задержка перед удалением мёртвого тела
    pub death_delay: f32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            invincibility_duration: 2.0,
            blink_interval: 0.1,
            knockback_force: 10.0,
            knockback_lock: 0.2,
            death_knockback_multiplier: 1.5,
            death_delay: 0.5,
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_health <= 0.0 {
            return Err(ConfigError::invalid("health.max_health", "must be positive"));
        }
        non_negative("health.invincibility_duration", self.invincibility_duration)?;
        non_negative("health.blink_interval", self.blink_interval)?;
        non_negative("health.knockback_force", self.knockback_force)?;
        non_negative("health.knockback_lock", self.knockback_lock)?;
        non_negative("health.death_knockback_multiplier", self.death_knockback_multiplier)?;
        non_negative("health.death_delay", self.death_delay)?;
        Ok(())
    }
}

/// Полный профиль бойца
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatProfile {
    pub weight: f32,
    pub health: HealthConfig,
    /// None — боец не атакует
    pub attack: Option<AttackConfig>,
    /// true — атака идёт через sequencer + telegraph (враги);
    /// false — удары приходят напрямую от анимации (игрок)
    pub sequenced: bool,
    pub telegraph: TelegraphConfig,
    /// None — боец не умеет парировать
    pub parry: Option<ParryConfig>,
}

impl Default for CombatProfile {
    fn default() -> Self {
        Self::grunt()
    }
}

impl CombatProfile {
    /// Обычный враг: средний вес, flash telegraph
    pub fn grunt() -> Self {
        Self {
            weight: 50.0,
            health: HealthConfig {
                invincibility_duration: 0.0,
                knockback_force: 5.0,
                knockback_lock: 0.0,
                ..HealthConfig::default()
            },
            attack: Some(AttackConfig::default()),
            sequenced: true,
            telegraph: TelegraphConfig::default(),
            parry: None,
        }
    }

    /// Тяжёлый враг: пробивает parry игрока, длинный combined telegraph
    pub fn brute() -> Self {
        Self {
            weight: 80.0,
            health: HealthConfig {
                max_health: 200.0,
                invincibility_duration: 0.0,
                knockback_force: 2.5,
                knockback_lock: 0.0,
                ..HealthConfig::default()
            },
            attack: Some(AttackConfig {
                attack_damage: 20.0,
                attack_range: 2.0,
                attack_cooldown: 2.5,
                hitbox_size: Vec2::new(1.5, 1.0),
                hitbox_offset: Vec2::new(1.25, 0.0),
                ..AttackConfig::default()
            }),
            sequenced: true,
            telegraph: TelegraphConfig {
                variant: TelegraphVariant::Combined,
                duration: 0.4,
                ..TelegraphConfig::default()
            },
            parry: None,
        }
    }

    /// Игрок: i-frames, parry, удары по врагам напрямую от анимации
    pub fn player() -> Self {
        Self {
            weight: 50.0,
            health: HealthConfig::default(),
            attack: Some(AttackConfig {
                attack_damage: 10.0,
                hitbox_size: Vec2::new(1.0, 1.0),
                hitbox_offset: Vec2::new(1.0, 1.0),
                target_layers: ENEMY_LAYER.bits(),
                attack_trigger: "attack".into(),
                ..AttackConfig::default()
            }),
            sequenced: false,
            telegraph: TelegraphConfig::default(),
            parry: Some(ParryConfig::default()),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let profile: CombatProfile = serde_json::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("weight", self.weight)?;
        self.health.validate()?;
        if let Some(attack) = &self.attack {
            attack.validate()?;
        }
        if self.sequenced {
            if self.attack.is_none() {
                return Err(ConfigError::invalid("sequenced", "sequenced attacker needs an attack"));
            }
            self.telegraph.validate()?;
        }
        if let Some(parry) = &self.parry {
            parry.validate()?;
        }
        Ok(())
    }

    /// Спавнит бойца со всеми capabilities из профиля.
    ///
    /// `layer` — membership тела (по нему фильтруют hitbox'ы противников).
    pub fn spawn(&self, commands: &mut Commands, position: Vec3, layer: Group) -> Entity {
        let mut entity = commands.spawn((
            Combatant,
            CombatWeight(self.weight),
            Health::new(self.health.max_health),
            self.health.clone(),
            Transform::from_translation(position),
            Hurtbox::default(),
            CollisionGroups::new(layer, Group::ALL),
            Velocity::zero(),
            ExternalImpulse::default(),
        ));

        if let Some(attack) = &self.attack {
            entity.insert(attack.clone());
            if self.sequenced {
                entity.insert((
                    AttackSequencer::default(),
                    TelegraphController::default(),
                    self.telegraph.clone(),
                ));
            }
        }

        if let Some(parry) = &self.parry {
            entity.insert((ParryWindow::default(), parry.clone()));
        }

        entity.id()
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{} must be finite and >= 0", value)))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Clip lengths (fallback для impact callback)
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ClipManifestEntry {
    name: String,
    frames: u32,
}

#[derive(Deserialize)]
struct ClipManifest {
    animations: Vec<ClipManifestEntry>,
}

/// Длины анимационных клипов по trigger name (секунды)
#[derive(Resource, Debug, Clone, Default)]
pub struct ClipLengths {
    clips: HashMap<String, f32>,
}

impl ClipLengths {
    /// `{ "animations": [{ "name": "Attack1", "frames": 6 }] }` × `frame_secs`
    pub fn from_manifest_json(text: &str, frame_secs: f32) -> Result<Self, ConfigError> {
        non_negative("frame_secs", frame_secs)?;
        let manifest: ClipManifest = serde_json::from_str(text)?;
        let clips = manifest
            .animations
            .into_iter()
            .map(|clip| (clip.name, clip.frames as f32 * frame_secs))
            .collect();
        Ok(Self { clips })
    }

    pub fn insert(&mut self, name: impl Into<String>, seconds: f32) {
        self.clips.insert(name.into(), seconds);
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.clips.get(name).copied()
    }

    /// `estimatedClipLength(name)` с fallback значением
    pub fn estimated_clip_length(&self, name: &str, fallback: f32) -> f32 {
        self.get(name).unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(CombatProfile::grunt().validate().is_ok());
        assert!(CombatProfile::brute().validate().is_ok());
        assert!(CombatProfile::player().validate().is_ok());
    }

    #[test]
    fn test_parry_cooldown_shorter_than_window_rejected() {
        let mut profile = CombatProfile::player();
        profile.parry = Some(ParryConfig {
            parry_window: 0.5,
            parry_cooldown: 0.3,
            ..ParryConfig::default()
        });

        let err = profile.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "parry.parry_cooldown", .. }));
    }

    #[test]
    fn test_profile_from_json_uses_defaults() {
        let profile = CombatProfile::from_json_str(
            r#"{ "weight": 70.0, "attack": { "attack_damage": 25.0 } }"#,
        )
        .unwrap();

        assert_eq!(profile.weight, 70.0);
        let attack = profile.attack.unwrap();
        assert_eq!(attack.attack_damage, 25.0);
        assert_eq!(attack.attack_range, 1.5);
        assert_eq!(attack.attack_trigger, "Attack1");
    }

    #[test]
    fn test_profile_from_json_rejects_negative_weight() {
        let err = CombatProfile::from_json_str(r#"{ "weight": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "weight", .. }));
    }

    #[test]
    fn test_profile_from_json_malformed() {
        let err = CombatProfile::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CombatProfile::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_clip_lengths_manifest() {
        let clips = ClipLengths::from_manifest_json(
            r#"{ "animations": [ { "name": "Attack1", "frames": 6 }, { "name": "windup", "frames": 3 } ] }"#,
            0.1,
        )
        .unwrap();

        assert!((clips.estimated_clip_length("Attack1", 0.5) - 0.6).abs() < 1e-5);
        assert_eq!(clips.estimated_clip_length("unknown", 0.5), 0.5);
    }
}
