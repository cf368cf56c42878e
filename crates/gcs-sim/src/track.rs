//! Flight-path recorder

use gcs_core::{GeoBounds, GeoPoint};

/// Ordered, append-only log of positions, one per mission tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlightTrack {
    points: Vec<GeoPoint>,
}

impl FlightTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append this tick's position. No deduplication, no downsampling.
    pub fn record(&mut self, point: GeoPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Bounding box for fitting the path on a map
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::enclosing(&self.points)
    }

    /// Ground distance covered along the recorded path, in meters
    pub fn path_length_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }
}
