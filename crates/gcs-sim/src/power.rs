//! Battery model
//!
//! Two independent drain models share one battery: the mission model
//! (per-tick baseline plus jitter) and the much slower standby model. The
//! caller picks exactly one per tick from the mission-active flag.

use crate::config::PowerConfig;
use gcs_core::Battery;
use rand::Rng;

/// Drain applied by one mission tick, in `[base, base + jitter)`
pub fn mission_drain<R: Rng + ?Sized>(cfg: &PowerConfig, rng: &mut R) -> f64 {
    if cfg.mission_drain_jitter > 0.0 {
        rng.gen_range(cfg.mission_drain_base..cfg.max_drain_per_tick())
    } else {
        cfg.mission_drain_base
    }
}

/// Battery after one mission tick. Never increases, never below zero.
pub fn mission_step<R: Rng + ?Sized>(previous_percent: f64, cfg: &PowerConfig, rng: &mut R) -> Battery {
    let drain = mission_drain(cfg, rng);
    Battery::from_percentage((previous_percent - drain).max(0.0))
}

/// Battery after one idle clock tick
pub fn standby_step(previous_percent: f64, cfg: &PowerConfig) -> Battery {
    Battery::from_percentage((previous_percent - cfg.standby_drain).max(0.0))
}

/// True only on the tick the charge first drops below the threshold
pub fn crossed_low_threshold(previous_percent: f64, current_percent: f64, threshold: f64) -> bool {
    previous_percent >= threshold && current_percent < threshold
}
