//! # GCS Sim - Telemetry Simulation Engine
//!
//! Synthesises a believable stream of drone telemetry for the ground-control
//! dashboard while a survey mission runs.
//!
//! ## Features
//! - Loiter kinematics around a home position with bounded attitude jitter
//! - Mission battery drain and an independent standby drain
//! - Periodic standing-water site detections on a fixed 25 s cycle
//! - Append-only flight track, handed over with the detection log on mission end
//! - Best-effort home lookup with a fallback coordinate
//!
//! The per-tick logic is a pure fold over [`SimState`]; [`SimulationDriver`]
//! owns the timer, the lock and the publication channels.

pub mod clock;
pub mod config;
pub mod detection;
pub mod driver;
pub mod error;
pub mod events;
pub mod kinematics;
pub mod location;
pub mod power;
pub mod state;
pub mod track;

pub use clock::{ClockReading, IdleClock};
pub use config::{DetectionConfig, PowerConfig, SimConfig};
pub use detection::DetectorState;
pub use driver::{EngineStats, SimulationDriver};
pub use error::{LocationError, SimError, SimResult};
pub use events::EventBus;
pub use location::{FixedLocation, LocationProvider, NoLocation};
pub use state::{Effect, SimState, Transition};
pub use track::FlightTrack;
