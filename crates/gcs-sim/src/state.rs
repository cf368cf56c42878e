//! Mission run state and the per-tick transition
//!
//! [`SimState`] is folded over ticks: every transition consumes the previous
//! state and returns the next one together with the side effects the driver
//! must publish. Nothing here touches clocks, locks or channels.

use crate::config::SimConfig;
use crate::detection::{self, DetectorState};
use crate::kinematics;
use crate::power;
use crate::track::FlightTrack;

use gcs_core::{
    format_flight_time, Battery, DetectionEvent, FlightMode, GeoPoint, MissionSummary,
    TelemetrySnapshot,
};
use rand::Rng;

/// Heading reported at arming
const INITIAL_HEADING: f64 = 345.0;

/// Everything the engine remembers between ticks
#[derive(Debug, Clone)]
pub struct SimState {
    active: bool,
    elapsed_seconds: u64,
    home: GeoPoint,
    heading: f64,
    battery: Battery,
    detector: DetectorState,
    track: FlightTrack,
    detections: Vec<DetectionEvent>,
    snapshot: TelemetrySnapshot,
}

/// Observable consequence of a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    MissionStarted { home: GeoPoint },
    Ticked,
    SiteDetected(DetectionEvent),
    BatteryLow { percentage: f64 },
    MissionEnded(MissionSummary),
}

/// Next state plus what happened on the way
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SimState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn quiet(state: SimState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    /// The summary handed over when this transition ended a mission
    pub fn summary(&self) -> Option<&MissionSummary> {
        self.effects.iter().find_map(|e| match e {
            Effect::MissionEnded(summary) => Some(summary),
            _ => None,
        })
    }
}

impl SimState {
    /// Quiescent state at process start
    pub fn new(home: GeoPoint, battery_percent: f64) -> Self {
        let battery = Battery::from_percentage(battery_percent);
        Self {
            active: false,
            elapsed_seconds: 0,
            home,
            heading: INITIAL_HEADING,
            battery,
            detector: DetectorState::Idle,
            track: FlightTrack::new(),
            detections: Vec::new(),
            snapshot: TelemetrySnapshot::quiescent(home, battery.percentage),
        }
    }

    pub fn from_config(cfg: &SimConfig) -> Self {
        Self::new(cfg.fallback_home, cfg.initial_battery_percent)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn home(&self) -> GeoPoint {
        self.home
    }

    pub fn battery(&self) -> Battery {
        self.battery
    }

    pub fn track(&self) -> &FlightTrack {
        &self.track
    }

    pub fn detections(&self) -> &[DetectionEvent] {
        &self.detections
    }

    pub fn detector(&self) -> &DetectorState {
        &self.detector
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    /// Single entry point for the fold: `active` is the external mission flag.
    ///
    /// - inactive -> active: arm and reset the run at the current home
    /// - active -> active: one simulation tick
    /// - active -> inactive: hand over the summary and return to quiescent
    /// - inactive -> inactive: one standby-drain step
    pub fn advance<R: Rng + ?Sized>(self, active: bool, cfg: &SimConfig, rng: &mut R) -> Transition {
        match (self.active, active) {
            (false, true) => {
                let home = self.home;
                self.begin(home)
            }
            (true, true) => self.tick(cfg, rng),
            (true, false) => self.finish(),
            (false, false) => Transition::quiet(self.standby(cfg)),
        }
    }

    /// Arm and reset the run around `home`. Battery carries over.
    pub fn begin(self, home: GeoPoint) -> Transition {
        let battery = self.battery;
        let mut snapshot = TelemetrySnapshot::quiescent(home, battery.percentage);
        snapshot.armed_state = true;

        let state = Self {
            active: true,
            elapsed_seconds: 0,
            home,
            heading: INITIAL_HEADING,
            battery,
            detector: DetectorState::Idle,
            track: FlightTrack::new(),
            detections: Vec::new(),
            snapshot,
        };

        Transition {
            state,
            effects: vec![Effect::MissionStarted { home }],
        }
    }

    /// Advance the mission by exactly one second.
    ///
    /// Elapsed time moves first; position/attitude, battery and detector are
    /// then evaluated in that order against the new second.
    pub fn tick<R: Rng + ?Sized>(mut self, cfg: &SimConfig, rng: &mut R) -> Transition {
        debug_assert!(self.active, "tick on an inactive run");
        let mut effects = vec![Effect::Ticked];

        self.elapsed_seconds += 1;
        let elapsed = self.elapsed_seconds;

        let kin = kinematics::generate(elapsed, self.home, self.heading, cfg.loiter_radius_deg, rng);

        let previous_percent = self.battery.percentage;
        let battery = power::mission_step(previous_percent, &cfg.power, rng);
        if power::crossed_low_threshold(previous_percent, battery.percentage, cfg.power.low_battery_threshold) {
            effects.push(Effect::BatteryLow {
                percentage: battery.percentage,
            });
        }

        let step = detection::step(&self.detector, elapsed, &cfg.detection, rng);
        if let Some(event) = step.new_event {
            self.detections.push(event.clone());
            effects.push(Effect::SiteDetected(event));
        }

        self.track.record(kin.position);

        self.heading = kin.heading;
        self.battery = battery;
        self.detector = step.state;
        self.snapshot = TelemetrySnapshot {
            position: kin.position,
            altitude: kin.altitude,
            speed: kin.speed,
            roll: kin.roll,
            pitch: kin.pitch,
            heading: kin.heading,
            signal_strength: self.snapshot.signal_strength,
            battery,
            satellite_count: self.snapshot.satellite_count,
            elapsed_seconds: elapsed,
            elapsed_flight_time: format_flight_time(elapsed),
            distance_from_home: kin.distance_from_home,
            flight_mode: FlightMode::Loiter,
            armed_state: true,
            active_detection: self.detector.active().cloned(),
            detection_log: self.detections.clone(),
            flight_path: self.track.points().to_vec(),
        };

        Transition {
            state: self,
            effects,
        }
    }

    /// Hand over the mission artifacts and return to a quiescent state
    pub fn finish(self) -> Transition {
        if !self.active {
            return Transition::quiet(self);
        }

        let summary = MissionSummary {
            flight_time: self.snapshot.elapsed_flight_time.clone(),
            elapsed_seconds: self.elapsed_seconds,
            home: self.home,
            bounds: self.track.bounds(),
            distance_flown_m: self.track.path_length_m(),
            flight_path: self.track.into_points(),
            detections: self.detections,
            final_battery_percent: self.battery.percentage,
        };

        let state = Self::new(self.home, self.battery.percentage);
        Transition {
            state,
            effects: vec![Effect::MissionEnded(summary)],
        }
    }

    /// One idle clock step. Only the standby model drains while inactive.
    pub fn standby(mut self, cfg: &SimConfig) -> Self {
        if self.active {
            return self;
        }
        self.battery = power::standby_step(self.battery.percentage, &cfg.power);
        self.snapshot.battery = self.battery;
        self
    }

    /// Move the loiter centre after a late location fix.
    ///
    /// Already-recorded track points are left untouched; the displayed
    /// position jumps to the new home until the next tick.
    pub fn relocate_home(mut self, home: GeoPoint) -> Self {
        self.home = home;
        self.snapshot.position = home;
        self
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
