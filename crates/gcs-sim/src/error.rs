//! Error types for the simulation engine

use thiserror::Error;

/// Simulation engine errors
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid simulation config: {0}")]
    InvalidConfig(String),
}

impl SimError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// Failure outcomes of a current-position request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    Denied,

    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("location request timed out")]
    Timeout,
}

impl LocationError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
