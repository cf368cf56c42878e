//! Simulation driver: mission lifecycle and the fixed-period tick loop

use crate::config::SimConfig;
use crate::error::SimResult;
use crate::events::EventBus;
use crate::location::{self, LocationProvider};
use crate::state::{Effect, SimState, Transition};

use gcs_core::{Battery, Event, GeoPoint, MissionSummary, TelemetrySnapshot};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Driver statistics
#[derive(Debug, Default, Clone)]
pub struct EngineStats {
    pub ticks_processed: u64,
    pub events_emitted: u64,
    pub detections_logged: u64,
    pub missions_started: u64,
    pub missions_completed: u64,
    pub location_fallbacks: u64,
}

/// Run state guarded by a single lock.
///
/// `generation` changes on every start and stop; a ticker or location task
/// only acts while the generation it was spawned with is still current.
struct RunCell {
    state: SimState,
    generation: u64,
    rng: StdRng,
}

struct Inner {
    config: SimConfig,
    run: Mutex<RunCell>,
    location: Arc<dyn LocationProvider>,
    events: EventBus,
    snapshot_tx: watch::Sender<TelemetrySnapshot>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    stats: RwLock<EngineStats>,
}

/// Owns the active/inactive lifecycle and publishes one snapshot per tick.
///
/// The engine trusts its caller to issue well-formed start/end commands:
/// starting an already-active mission is ignored, ending an idle one
/// returns `None`.
#[derive(Clone)]
pub struct SimulationDriver {
    inner: Arc<Inner>,
}

impl SimulationDriver {
    /// Create an idle driver
    pub fn new(config: SimConfig, location: Arc<dyn LocationProvider>) -> SimResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = SimState::from_config(&config);
        let (snapshot_tx, _) = watch::channel(state.snapshot().clone());
        let events = EventBus::new(config.event_capacity);

        info!(
            "Simulation driver ready (home {:?}, battery {:.1}%)",
            config.fallback_home, config.initial_battery_percent
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                run: Mutex::new(RunCell {
                    state,
                    generation: 0,
                    rng,
                }),
                location,
                events,
                snapshot_tx,
                ticker: Mutex::new(None),
                stats: RwLock::new(EngineStats::default()),
            }),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.inner.config
    }

    /// Current snapshot, read-only
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Receive every published snapshot
    pub fn subscribe_snapshots(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Receive engine events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn is_active(&self) -> bool {
        self.inner.run.lock().state.is_active()
    }

    pub fn battery(&self) -> Battery {
        self.inner.run.lock().state.battery()
    }

    pub fn home(&self) -> GeoPoint {
        self.inner.run.lock().state.home()
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.stats.read().clone()
    }

    /// Arm and begin ticking. Must be called from within a Tokio runtime.
    ///
    /// The mission starts at once around the best-known home; the location
    /// lookup runs in the background and moves the home if it succeeds.
    /// Returns `None` without touching the run when a mission is already
    /// active.
    pub fn start(&self) -> Option<TelemetrySnapshot> {
        let (generation, snapshot) = {
            let mut cell = self.inner.run.lock();
            if cell.state.is_active() {
                warn!("Start requested while a mission is already active; ignoring");
                return None;
            }

            cell.generation += 1;
            let state = std::mem::take(&mut cell.state);
            let transition = state.advance(true, &self.inner.config, &mut cell.rng);
            cell.state = self.inner.publish(transition);
            (cell.generation, cell.state.snapshot().clone())
        };

        self.inner.stats.write().missions_started += 1;
        info!("Mission started (generation {})", generation);

        self.spawn_location_lookup(generation);
        self.spawn_ticker(generation);

        Some(snapshot)
    }

    /// Cancel the periodic tick. Run state is left for the caller to read.
    ///
    /// Once this returns no further tick can execute for the stopped mission.
    pub fn stop(&self) {
        {
            let mut cell = self.inner.run.lock();
            cell.generation += 1;
        }
        if let Some(handle) = self.inner.ticker.lock().take() {
            handle.abort();
        }
        debug!("Mission ticker stopped");
    }

    /// Hand over the mission artifacts and revert to a quiescent state
    pub fn teardown(&self) -> Option<MissionSummary> {
        let mut cell = self.inner.run.lock();
        if !cell.state.is_active() {
            return None;
        }

        let state = std::mem::take(&mut cell.state);
        let transition = state.finish();
        let summary = transition.summary().cloned();
        cell.state = self.inner.publish(transition);
        drop(cell);

        if let Some(summary) = &summary {
            self.inner.stats.write().missions_completed += 1;
            info!(
                "Mission ended after {} with {} track points and {} detections",
                summary.flight_time,
                summary.flight_path.len(),
                summary.detections.len()
            );
        }
        summary
    }

    /// Stop ticking and tear down; `None` when no mission was active
    pub fn end_mission(&self) -> Option<MissionSummary> {
        self.stop();
        self.teardown()
    }

    /// Apply one standby-drain step if no mission is active
    pub fn standby_tick(&self) -> Option<Battery> {
        let mut cell = self.inner.run.lock();
        if cell.state.is_active() {
            return None;
        }
        let state = std::mem::take(&mut cell.state);
        cell.state = state.standby(&self.inner.config);
        let battery = cell.state.battery();
        self.inner.snapshot_tx.send_replace(cell.state.snapshot().clone());
        Some(battery)
    }

    fn spawn_ticker(&self, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.tick_period();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.tick_once(generation) {
                    break;
                }
            }
            debug!("Ticker for generation {} exited", generation);
        });

        if let Some(previous) = self.inner.ticker.lock().replace(handle) {
            previous.abort();
        }
    }

    fn spawn_location_lookup(&self, generation: u64) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let provider = Arc::clone(&self.inner.location);
        let timeout = self.inner.config.location_timeout();

        tokio::spawn(async move {
            let result = location::resolve_home(provider.as_ref(), timeout).await;
            if let Some(inner) = weak.upgrade() {
                inner.apply_home(generation, result);
            }
        });
    }
}

impl Inner {
    /// One serialised tick: compute and publish while holding the run lock
    fn tick_once(&self, generation: u64) -> bool {
        let mut cell = self.run.lock();
        if cell.generation != generation || !cell.state.is_active() {
            return false;
        }

        let state = std::mem::take(&mut cell.state);
        let transition = state.advance(true, &self.config, &mut cell.rng);
        cell.state = self.publish(transition);

        self.stats.write().ticks_processed += 1;
        debug!(
            "Tick {} published ({} track points)",
            cell.state.elapsed_seconds(),
            cell.state.track().len()
        );
        true
    }

    /// Late location result. Only applies to the mission that asked for it.
    fn apply_home(&self, generation: u64, result: Result<GeoPoint, crate::error::LocationError>) {
        let home = match result {
            Ok(home) => home,
            Err(e) => {
                warn!("Location unavailable ({}); using default home coordinates", e);
                self.stats.write().location_fallbacks += 1;
                self.config.fallback_home
            }
        };

        let mut cell = self.run.lock();
        if cell.generation != generation || !cell.state.is_active() {
            debug!("Discarding location result for stale mission generation {}", generation);
            return;
        }
        if cell.state.home() == home {
            return;
        }

        let state = std::mem::take(&mut cell.state);
        cell.state = state.relocate_home(home);
        self.snapshot_tx.send_replace(cell.state.snapshot().clone());
        self.emit(Event::home_resolved(home));
        info!("Home position updated to ({:.6}, {:.6})", home.latitude, home.longitude);
    }

    /// Replace the published snapshot and emit one event per effect
    fn publish(&self, transition: Transition) -> SimState {
        let Transition { state, effects } = transition;
        let snapshot = state.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());

        for effect in effects {
            let event = match effect {
                Effect::MissionStarted { home } => Event::mission_started(home, snapshot.battery.percentage),
                Effect::Ticked => Event::telemetry_updated(snapshot.frame()),
                Effect::SiteDetected(detection) => {
                    info!(
                        "Site detected at {}: {}",
                        snapshot.elapsed_flight_time, detection
                    );
                    self.stats.write().detections_logged += 1;
                    Event::site_detected(detection, snapshot.elapsed_seconds, snapshot.position)
                }
                Effect::BatteryLow { percentage } => {
                    warn!("Battery low: {:.1}%", percentage);
                    Event::battery_low(percentage, self.config.power.low_battery_threshold)
                }
                Effect::MissionEnded(summary) => Event::mission_ended(summary),
            };
            self.emit(event);
        }

        state
    }

    fn emit(&self, event: Event) {
        self.events.publish(event);
        self.stats.write().events_emitted += 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
