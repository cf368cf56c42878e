//! # GCS Core
//!
//! Core domain models and types for the survey drone ground-control system.
//! This crate provides the shared types used by the simulation engine, the
//! metrics exporter, the WebSocket hub and the API server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod error;
pub mod events;
pub mod geo;

pub use error::{CoreError, CoreResult};
pub use events::*;
pub use geo::*;

/// Home position used when no real-world fix can be obtained
pub const FALLBACK_HOME: GeoPoint = GeoPoint::new(34.0522, -118.2437);

// ============================================================================
// FLIGHT MODE
// ============================================================================

/// Autopilot flight mode reported in telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlightMode {
    Stabilize,
    /// Hold position, circling the home point
    #[default]
    Loiter,
    Auto,
    #[serde(rename = "RTL")]
    ReturnToLaunch,
    Land,
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightMode::Stabilize => write!(f, "Stabilize"),
            FlightMode::Loiter => write!(f, "Loiter"),
            FlightMode::Auto => write!(f, "Auto"),
            FlightMode::ReturnToLaunch => write!(f, "RTL"),
            FlightMode::Land => write!(f, "Land"),
        }
    }
}

impl FromStr for FlightMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stabilize" => Ok(Self::Stabilize),
            "loiter" => Ok(Self::Loiter),
            "auto" => Ok(Self::Auto),
            "rtl" | "returntolaunch" => Ok(Self::ReturnToLaunch),
            "land" => Ok(Self::Land),
            other => Err(CoreError::InvalidFlightMode(other.to_string())),
        }
    }
}

// ============================================================================
// BATTERY
// ============================================================================

/// Pack voltage at 0% charge (4S LiPo cutoff)
pub const BATTERY_MIN_VOLTAGE: f64 = 12.0;
/// Voltage gained between 0% and 100% charge
pub const BATTERY_VOLTAGE_SPAN: f64 = 4.8;

/// Battery state of charge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battery {
    /// Pack voltage, never below [`BATTERY_MIN_VOLTAGE`]
    pub voltage_volts: f64,
    /// Remaining charge (0-100)
    pub percentage: f64,
}

impl Battery {
    /// Derive the pack state from a charge percentage.
    ///
    /// Percentage is clamped to `[0, 100]`; voltage is linear in percentage
    /// with a floor at 12.0V.
    pub fn from_percentage(percentage: f64) -> Self {
        let percentage = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 100.0)
        };
        let voltage_volts =
            (BATTERY_MIN_VOLTAGE + (percentage / 100.0) * BATTERY_VOLTAGE_SPAN).max(BATTERY_MIN_VOLTAGE);

        Self {
            voltage_volts,
            percentage,
        }
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::from_percentage(100.0)
    }
}

// ============================================================================
// DETECTION MODELS
// ============================================================================

/// Kind of standing-water site spotted by the onboard camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteCategory {
    /// Small man-made containers holding water
    Enclosed,
    /// Open ground water
    Open,
}

impl SiteCategory {
    pub const ALL: [SiteCategory; 2] = [SiteCategory::Enclosed, SiteCategory::Open];

    /// Object labels the detector can report for this category
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            SiteCategory::Enclosed => &["Flower Pots", "Discarded Containers", "Clogged Gutters"],
            SiteCategory::Open => &["Stagnant Ponds", "Construction Puddles", "Old Tires"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteCategory::Enclosed => "Enclosed",
            SiteCategory::Open => "Open",
        }
    }
}

impl fmt::Display for SiteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enclosed" => Ok(Self::Enclosed),
            "open" => Ok(Self::Open),
            other => Err(CoreError::InvalidSiteCategory(other.to_string())),
        }
    }
}

/// A site of interest flagged during a mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub category: SiteCategory,
    pub label: String,
}

impl DetectionEvent {
    pub fn new(category: SiteCategory, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }
}

impl fmt::Display for DetectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.category, self.label)
    }
}

// ============================================================================
// TELEMETRY SNAPSHOT
// ============================================================================

/// Format whole seconds as `mm:ss`. Minutes are not wrapped at the hour.
pub fn format_flight_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Complete drone state at one instant, replaced wholesale every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub position: GeoPoint,
    /// Meters
    pub altitude: f64,
    /// Meters per second
    pub speed: f64,
    /// Degrees
    pub roll: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees in `[0, 360)`
    pub heading: f64,
    /// dBm
    pub signal_strength: i32,
    pub battery: Battery,
    pub satellite_count: u32,
    pub elapsed_seconds: u64,
    /// `mm:ss`
    pub elapsed_flight_time: String,
    /// Meters
    pub distance_from_home: f64,
    pub flight_mode: FlightMode,
    pub armed_state: bool,
    pub active_detection: Option<DetectionEvent>,
    pub detection_log: Vec<DetectionEvent>,
    pub flight_path: Vec<GeoPoint>,
}

impl TelemetrySnapshot {
    /// Disarmed, stationary state shown while no mission is flying
    pub fn quiescent(position: GeoPoint, battery_percent: f64) -> Self {
        Self {
            position,
            altitude: 0.0,
            speed: 0.0,
            roll: 0.0,
            pitch: 0.0,
            heading: 345.0,
            signal_strength: -55,
            battery: Battery::from_percentage(battery_percent),
            satellite_count: 14,
            elapsed_seconds: 0,
            elapsed_flight_time: format_flight_time(0),
            distance_from_home: 0.0,
            flight_mode: FlightMode::Loiter,
            armed_state: false,
            active_detection: None,
            detection_log: Vec::new(),
            flight_path: Vec::new(),
        }
    }

    /// Per-tick view without the accumulated logs
    pub fn frame(&self) -> TelemetryFrame {
        TelemetryFrame {
            position: self.position,
            altitude: self.altitude,
            speed: self.speed,
            roll: self.roll,
            pitch: self.pitch,
            heading: self.heading,
            signal_strength: self.signal_strength,
            battery: self.battery,
            satellite_count: self.satellite_count,
            elapsed_seconds: self.elapsed_seconds,
            elapsed_flight_time: self.elapsed_flight_time.clone(),
            distance_from_home: self.distance_from_home,
            flight_mode: self.flight_mode,
            armed_state: self.armed_state,
            active_detection: self.active_detection.clone(),
            detection_count: self.detection_log.len(),
            track_points: self.flight_path.len(),
        }
    }
}

/// Snapshot scalars streamed on every tick. While a mission is active,
/// `position` is the point appended to the flight path on that tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    pub position: GeoPoint,
    pub altitude: f64,
    pub speed: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heading: f64,
    pub signal_strength: i32,
    pub battery: Battery,
    pub satellite_count: u32,
    pub elapsed_seconds: u64,
    pub elapsed_flight_time: String,
    pub distance_from_home: f64,
    pub flight_mode: FlightMode,
    pub armed_state: bool,
    pub active_detection: Option<DetectionEvent>,
    pub detection_count: usize,
    pub track_points: usize,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::quiescent(FALLBACK_HOME, 99.0)
    }
}

// ============================================================================
// MISSION MODELS
// ============================================================================

/// Unique identifier for a recorded mission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionId(pub Uuid);

impl MissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MissionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::mission_not_found(s))
    }
}

/// Outcome of a flown mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    Completed,
    /// Ended with a depleted battery
    Interrupted,
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionStatus::Completed => write!(f, "Completed"),
            MissionStatus::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Artifacts handed over by the engine when a mission ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionSummary {
    /// `mm:ss`
    pub flight_time: String,
    pub elapsed_seconds: u64,
    pub home: GeoPoint,
    pub flight_path: Vec<GeoPoint>,
    /// Map-fitting box around `flight_path`, `None` when nothing was recorded
    pub bounds: Option<GeoBounds>,
    /// Summed haversine length of `flight_path`
    pub distance_flown_m: f64,
    pub detections: Vec<DetectionEvent>,
    pub final_battery_percent: f64,
}

impl MissionSummary {
    pub fn status(&self) -> MissionStatus {
        if self.final_battery_percent <= 0.0 {
            MissionStatus::Interrupted
        } else {
            MissionStatus::Completed
        }
    }
}

/// A mission as kept in the flight history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionRecord {
    pub id: MissionId,
    pub name: String,
    /// `Month D, YYYY`
    pub date: String,
    pub location: String,
    pub status: MissionStatus,
    /// `mm:ss`
    pub duration: String,
    pub elapsed_seconds: u64,
    pub flight_path: Vec<GeoPoint>,
    pub bounds: Option<GeoBounds>,
    pub distance_flown_m: f64,
    pub detections: Vec<DetectionEvent>,
    pub recorded_at: DateTime<Utc>,
}

impl MissionRecord {
    /// Build a history record from an engine summary
    pub fn from_summary(
        name: impl Into<String>,
        location: impl Into<String>,
        summary: MissionSummary,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MissionId::new(),
            name: name.into(),
            date: recorded_at.format("%B %-d, %Y").to_string(),
            location: location.into(),
            status: summary.status(),
            duration: summary.flight_time,
            elapsed_seconds: summary.elapsed_seconds,
            flight_path: summary.flight_path,
            bounds: summary.bounds,
            distance_flown_m: summary.distance_flown_m,
            detections: summary.detections,
            recorded_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
