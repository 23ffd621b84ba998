use surge_core::{ConfigError, ThresholdParseError};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("No scenario to run")]
    NoScenario,

    #[error("Invalid scenario configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid threshold: {0}")]
    Threshold(#[from] ThresholdParseError),

    #[error("Setup failed: {0}")]
    Setup(#[source] BoxError),
}
