//! Ошибки конфигурации
//!
//! Gameplay пути не возвращают ошибок: пропущенный удар или неудачный parry —
//! игровой исход, не сбой. `ConfigError` покрывает только загрузку профилей и
//! манифестов анимаций до старта симуляции.

use std::path::PathBuf;

/// Errors surfaced while loading or validating static combat configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON payload did not match the expected schema.
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    /// A value parsed fine but violates a combat invariant.
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
