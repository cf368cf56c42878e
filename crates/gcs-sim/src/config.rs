//! Configuration for the simulation engine

use crate::error::{SimError, SimResult};
use gcs_core::{GeoPoint, FALLBACK_HOME};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the telemetry simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Mission tick period in milliseconds
    pub tick_period_ms: u64,
    /// Idle wall-clock period in milliseconds
    pub clock_period_ms: u64,
    /// Home used when the location provider fails
    pub fallback_home: GeoPoint,
    /// Battery charge at process start
    pub initial_battery_percent: f64,
    /// Battery drain and alerting
    pub power: PowerConfig,
    /// Detection window settings
    pub detection: DetectionConfig,
    /// Loiter circle radius in degrees
    pub loiter_radius_deg: f64,
    /// Give up on the location provider after this many milliseconds
    pub location_timeout_ms: u64,
    /// RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1_000,
            clock_period_ms: 1_000,
            fallback_home: FALLBACK_HOME,
            initial_battery_percent: 98.7,
            power: PowerConfig::default(),
            detection: DetectionConfig::default(),
            loiter_radius_deg: 0.0005,
            location_timeout_ms: 10_000,
            seed: None,
            event_capacity: 1024,
        }
    }
}

impl SimConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn clock_period(&self) -> Duration {
        Duration::from_millis(self.clock_period_ms)
    }

    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    /// Deterministic configuration for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Reject settings the generators cannot honour
    pub fn validate(&self) -> SimResult<()> {
        if self.tick_period_ms == 0 || self.clock_period_ms == 0 {
            return Err(SimError::invalid_config("tick periods must be positive"));
        }
        if !self.fallback_home.is_valid() {
            return Err(SimError::invalid_config(format!(
                "fallback home {:?} is not a valid coordinate",
                self.fallback_home
            )));
        }
        if !(0.0..=100.0).contains(&self.initial_battery_percent) {
            return Err(SimError::invalid_config("initial battery must be within 0-100%"));
        }
        if self.event_capacity == 0 {
            return Err(SimError::invalid_config("event capacity must be positive"));
        }
        self.power.validate()?;
        self.detection.validate()
    }
}

/// Battery model parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Baseline mission drain, percent per tick
    pub mission_drain_base: f64,
    /// Upper bound of the extra random drain, percent per tick
    pub mission_drain_jitter: f64,
    /// Standby drain while no mission is active, percent per clock tick
    pub standby_drain: f64,
    /// `BatteryLow` is raised below this charge
    pub low_battery_threshold: f64,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            mission_drain_base: 0.05,
            mission_drain_jitter: 0.01,
            standby_drain: 0.0005,
            low_battery_threshold: 20.0,
        }
    }
}

impl PowerConfig {
    /// Largest amount one mission tick can remove
    pub fn max_drain_per_tick(&self) -> f64 {
        self.mission_drain_base + self.mission_drain_jitter
    }

    fn validate(&self) -> SimResult<()> {
        if self.mission_drain_base < 0.0 || self.mission_drain_jitter < 0.0 || self.standby_drain < 0.0 {
            return Err(SimError::invalid_config("battery drain rates must not be negative"));
        }
        Ok(())
    }
}

/// Windowed detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Length of one detection cycle in seconds
    pub cycle_seconds: u64,
    /// Exclusive lower bound of the window within the cycle
    pub window_open: u64,
    /// Exclusive upper bound of the window within the cycle
    pub window_close: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: 25,
            window_open: 10,
            window_close: 14,
        }
    }
}

impl DetectionConfig {
    /// Whether `elapsed_seconds` falls strictly inside the window
    pub fn in_window(&self, elapsed_seconds: u64) -> bool {
        let phase = elapsed_seconds % self.cycle_seconds;
        phase > self.window_open && phase < self.window_close
    }

    fn validate(&self) -> SimResult<()> {
        if self.cycle_seconds == 0 {
            return Err(SimError::invalid_config("detection cycle must be positive"));
        }
        if self.window_close <= self.window_open + 1 || self.window_close > self.cycle_seconds {
            return Err(SimError::invalid_config(format!(
                "detection window ({}, {}) must contain at least one second inside a {}s cycle",
                self.window_open, self.window_close, self.cycle_seconds
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_window_bounds_are_exclusive() {
        let cfg = DetectionConfig::default();
        let open: Vec<u64> = (0..25).filter(|s| cfg.in_window(*s)).collect();
        assert_eq!(open, vec![11, 12, 13]);
        assert!(cfg.in_window(36));
        assert!(!cfg.in_window(35));
    }

    #[test]
    fn test_rejects_bad_window() {
        let cfg = SimConfig {
            detection: DetectionConfig {
                cycle_seconds: 25,
                window_open: 20,
                window_close: 30,
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_period() {
        let cfg = SimConfig {
            tick_period_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_toml_style_override() {
        let cfg: SimConfig = serde_json::from_str(r#"{"seed": 7, "power": {"standby_drain": 0.001}}"#).unwrap();
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.power.standby_drain, 0.001);
        assert_eq!(cfg.power.mission_drain_base, 0.05);
        assert_eq!(cfg.tick_period_ms, 1_000);
    }
}
