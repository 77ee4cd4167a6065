//! Errors of the simulation driver.

use seccap_core::{ConfigError, SecrecyError};

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),

    #[error("Solver failed at {snr_db} dB: {source}")]
    Solver {
        snr_db: f64,
        #[source]
        source: SecrecyError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
