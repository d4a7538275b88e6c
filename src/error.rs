//! Error types shared by the engine, the batch driver and the CLI.

use thiserror::Error;

/// Errors that can occur while building or running a replicate
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid input parameters, detected before anything is constructed
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The arena produced no patches, so agents cannot be placed
    #[error("landscape of {width:.1} x {height:.1} cm at {density} patches/m^2 contains no patches")]
    EmptyLandscape { width: f64, height: f64, density: f64 },

    /// Occupancy bookkeeping is inconsistent; this is a programming defect
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
