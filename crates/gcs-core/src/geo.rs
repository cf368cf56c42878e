//! Geographic types and calculations for the survey drone

use serde::{Deserialize, Serialize};

/// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    #[serde(rename = "lat")]
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new geographic point
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if this point is valid
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Offset this point by raw degree deltas
    pub fn offset(&self, d_lat: f64, d_lon: f64) -> GeoPoint {
        GeoPoint::new(self.latitude + d_lat, self.longitude + d_lon)
    }

    /// Great-circle distance to another point using the Haversine formula.
    /// Returns distance in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

/// Axis-aligned lat/lon bounding box, used to fit a flight path on a map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self::new(p.latitude, p.latitude, p.longitude, p.longitude),
                Some(b) => Self::new(
                    b.min_lat.min(p.latitude),
                    b.max_lat.max(p.latitude),
                    b.min_lon.min(p.longitude),
                    b.max_lon.max(p.longitude),
                ),
            })
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
