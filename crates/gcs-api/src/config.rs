//! API server configuration

use gcs_core::{CoreError, GeoPoint};
use gcs_sim::{FixedLocation, LocationProvider, NoLocation, SimConfig};

use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::sync::Arc;

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API port
    pub api_port: u16,
    /// WebSocket port
    pub ws_port: u16,
    /// Enable CORS for all origins (development)
    pub cors_permissive: bool,
    /// Location label stored on mission records
    pub location_label: String,
    /// Operator position reported to the engine at mission start
    pub home_latitude: Option<f64>,
    pub home_longitude: Option<f64>,
    /// Simulation engine settings
    pub sim: SimConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: 3000,
            ws_port: 9090,
            cors_permissive: true,
            location_label: "Sector 7G".to_string(),
            home_latitude: None,
            home_longitude: None,
            sim: SimConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load from `.env`, an optional `gcs.toml`, then `GCS_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = Config::builder()
            .add_source(File::with_name("gcs").required(false))
            .add_source(
                Environment::with_prefix("GCS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config
            .sim
            .validate()
            .map_err(|e| ConfigError::Foreign(Box::new(CoreError::configuration(e.to_string()))))?;
        if let Some(home) = config.home_position() {
            if !home.is_valid() {
                let err = CoreError::invalid_position(home.latitude, home.longitude);
                return Err(ConfigError::Foreign(Box::new(err)));
            }
        }
        Ok(config)
    }

    /// Configured operator position, if both coordinates are set
    pub fn home_position(&self) -> Option<GeoPoint> {
        match (self.home_latitude, self.home_longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// Location source handed to the engine
    pub fn location_provider(&self) -> Arc<dyn LocationProvider> {
        match self.home_position() {
            Some(home) => Arc::new(FixedLocation(home)),
            None => Arc::new(NoLocation),
        }
    }
}
