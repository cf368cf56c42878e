//! Best-effort current-position lookup used to pick the mission home

use crate::error::LocationError;

use async_trait::async_trait;
use gcs_core::GeoPoint;
use std::time::Duration;
use tracing::debug;

/// Source of the operator's real-world position
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Exactly two outcomes: a coordinate pair, or a failure
    async fn current_position(&self) -> Result<GeoPoint, LocationError>;
}

/// Always reports the same coordinate
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPoint);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        Ok(self.0)
    }
}

/// Provider for hosts without any positioning source
#[derive(Debug, Clone, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        Err(LocationError::unavailable("no positioning source configured"))
    }
}

/// Query `provider`, bounded by `timeout`, rejecting out-of-range fixes
pub async fn resolve_home(
    provider: &dyn LocationProvider,
    timeout: Duration,
) -> Result<GeoPoint, LocationError> {
    let point = tokio::time::timeout(timeout, provider.current_position())
        .await
        .map_err(|_| LocationError::Timeout)??;

    if !point.is_valid() {
        return Err(LocationError::unavailable(format!(
            "provider returned invalid coordinate ({}, {})",
            point.latitude, point.longitude
        )));
    }

    debug!("Resolved home position {:?}", point);
    Ok(point)
}
