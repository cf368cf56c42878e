//! Application state management

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::history::MissionHistory;

use gcs_core::{MissionCommand, MissionRecord, TelemetrySnapshot};
use gcs_sim::{IdleClock, SimulationDriver};
use gcs_telemetry::MetricsCollector;
use gcs_websocket::WebSocketHub;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<ApiConfig>,
    /// Telemetry simulation engine
    pub driver: SimulationDriver,
    /// Mission start/end with history recording
    pub control: MissionControl,
    /// Flown missions
    pub history: Arc<MissionHistory>,
    /// Prometheus metrics
    pub metrics: Arc<MetricsCollector>,
    /// WebSocket hub for real-time updates
    pub ws_hub: Arc<WebSocketHub>,
    /// Idle display clock
    pub clock: Arc<IdleClock>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state. Must run inside the Tokio runtime.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let driver = SimulationDriver::new(config.sim.clone(), config.location_provider())?;
        let metrics = Arc::new(MetricsCollector::new()?);
        let history = Arc::new(MissionHistory::new());

        let control = MissionControl {
            driver: driver.clone(),
            history: history.clone(),
            location_label: Arc::from(config.location_label.as_str()),
        };

        let ws_hub = Arc::new(WebSocketHub::new());
        {
            let driver = driver.clone();
            ws_hub.set_snapshot_source(move || driver.snapshot());
        }
        {
            let control = control.clone();
            ws_hub.set_command_handler(move |command| {
                let result = match command {
                    MissionCommand::Start => control.start().map(|_| ()),
                    MissionCommand::End => control.end().map(|_| ()),
                };
                if let Err(e) = result {
                    warn!("WebSocket mission command {:?} rejected: {}", command, e);
                }
            });
        }
        info!("WebSocket hub initialized");

        let clock = Arc::new(IdleClock::spawn(driver.clone()));

        Ok(Self {
            config: Arc::new(config),
            driver,
            control,
            history,
            metrics,
            ws_hub,
            clock,
            started_at: Utc::now(),
        })
    }

    /// Forward engine events to WebSocket clients and metrics
    pub fn spawn_event_forwarder(&self) -> JoinHandle<()> {
        let mut rx = self.driver.subscribe();
        let hub = self.ws_hub.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        metrics.record_event(&event);
                        hub.broadcast(event);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event forwarder lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Get connected WebSocket client count
    pub fn ws_client_count(&self) -> usize {
        self.ws_hub.client_count()
    }
}

/// The caller that guards the engine lifecycle
#[derive(Clone)]
pub struct MissionControl {
    driver: SimulationDriver,
    history: Arc<MissionHistory>,
    location_label: Arc<str>,
}

impl MissionControl {
    pub fn start(&self) -> Result<TelemetrySnapshot, ApiError> {
        self.driver
            .start()
            .ok_or_else(|| ApiError::conflict("a mission is already active"))
    }

    /// End the mission and record it in the history
    pub fn end(&self) -> Result<MissionRecord, ApiError> {
        let summary = self
            .driver
            .end_mission()
            .ok_or_else(|| ApiError::conflict("no mission is active"))?;
        Ok(self.history.record(summary, &self.location_label, Utc::now()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
