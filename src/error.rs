//! Error types for the return engine and its loaders

use thiserror::Error;

/// Fatal errors raised before any derived computation starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An assumption is outside the domain the model is defined on
    #[error("invalid assumption: {field} ({reason})")]
    Configuration { field: &'static str, reason: String },

    /// A tunable engine constant is unusable (e.g. empty optimizer bounds)
    #[error("invalid engine config: {field} ({reason})")]
    EngineConfig { field: &'static str, reason: String },
}

impl EngineError {
    pub(crate) fn configuration(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Configuration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn engine_config(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::EngineConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            EngineError::Configuration { field, .. } | EngineError::EngineConfig { field, .. } => field,
        }
    }
}

/// Errors from reading deals or config overrides off disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown config key `{0}`")]
    UnknownKey(String),

    #[error("invalid value for `{key}`: {value}")]
    InvalidValue { key: String, value: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
