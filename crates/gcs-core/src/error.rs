//! Error types for the ground-control system

use thiserror::Error;

/// Core error type for the ground-control system
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Mission not found: {0}")]
    MissionNotFound(String),

    #[error("Invalid position: latitude={lat}, longitude={lon}")]
    InvalidPosition { lat: f64, lon: f64 },

    #[error("Invalid flight mode: {0}")]
    InvalidFlightMode(String),

    #[error("Invalid site category: {0}")]
    InvalidSiteCategory(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn mission_not_found(id: impl Into<String>) -> Self {
        Self::MissionNotFound(id.into())
    }

    pub fn invalid_position(lat: f64, lon: f64) -> Self {
        Self::InvalidPosition { lat, lon }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
