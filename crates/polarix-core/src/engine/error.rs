use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("No reciprocal-space solver attached; the short-range Coulomb kernel needs its splitting parameter")]
    MissingReciprocalSpace,

    #[error("Ghost-particle exchange failed: {0}")]
    GhostExchange(String),

    #[error("Force buffer holds {actual} entries but the system owns {expected} particles")]
    ForceBufferMismatch { expected: usize, actual: usize },
}
