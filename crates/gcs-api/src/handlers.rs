//! API request handlers

use crate::error::ApiError;
use crate::history::{OverviewStat, overview_stats};
use crate::state::AppState;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use gcs_core::{Event, EventType, MissionId, MissionRecord};
use gcs_sim::ClockReading;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default number of events returned by the recent-events endpoint
const DEFAULT_EVENT_LIMIT: usize = 50;

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub api: String,
    pub mission_active: bool,
    pub elapsed_flight_time: String,
    pub battery_percent: f64,
    pub websocket_clients: usize,
    pub websocket_events_broadcast: usize,
    pub missions_recorded: usize,
    pub ticks_processed: u64,
    pub events_emitted: u64,
    pub uptime_seconds: i64,
}

#[derive(Serialize)]
pub struct MissionListResponse {
    pub missions: Vec<MissionRecord>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct WebSocketInfoResponse {
    pub url: String,
    pub connected_clients: usize,
    pub supported_events: Vec<EventType>,
}

#[derive(Deserialize)]
pub struct EventQuery {
    pub limit: Option<usize>,
    pub event_type: Option<EventType>,
}

// ============================================================================
// HEALTH & STATUS HANDLERS
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// System status overview
pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.driver.snapshot();
    let stats = state.driver.stats();

    Json(StatusResponse {
        api: "running".into(),
        mission_active: state.driver.is_active(),
        elapsed_flight_time: snapshot.elapsed_flight_time,
        battery_percent: snapshot.battery.percentage,
        websocket_clients: state.ws_client_count(),
        websocket_events_broadcast: state.ws_hub.message_count(),
        missions_recorded: state.history.len(),
        ticks_processed: stats.ticks_processed,
        events_emitted: stats.events_emitted,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let metrics = &state.metrics;
    metrics.set_ws_connections(state.ws_client_count() as i64);
    metrics.sync_location_fallbacks(state.driver.stats().location_fallbacks);
    metrics.observe_frame(&state.driver.snapshot().frame());

    let body = metrics.export()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

// ============================================================================
// TELEMETRY HANDLERS
// ============================================================================

/// Current telemetry snapshot
pub async fn get_telemetry(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.driver.snapshot())
}

/// Recent engine events, oldest first
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Json<Vec<Event>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let events = match query.event_type {
        Some(event_type) => state.driver.events().get_recent_of(event_type, limit),
        None => state.driver.events().get_recent(limit),
    };
    Json(events)
}

/// Wall-clock for the idle display
pub async fn get_clock(State(state): State<AppState>) -> Json<ClockReading> {
    Json(state.clock.reading())
}

// ============================================================================
// MISSION HANDLERS
// ============================================================================

/// Start a mission
pub async fn start_mission(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.control.start()?;
    info!("Mission start requested via API");
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// End the active mission and return its history record
pub async fn end_mission(State(state): State<AppState>) -> Result<Json<MissionRecord>, ApiError> {
    let record = state.control.end()?;
    info!("Mission {} ended via API", record.name);
    Ok(Json(record))
}

/// Flight history, newest first
pub async fn list_missions(State(state): State<AppState>) -> impl IntoResponse {
    let missions = state.history.list();
    let total = missions.len();
    Json(MissionListResponse { missions, total })
}

/// One recorded mission
pub async fn get_mission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MissionRecord>, ApiError> {
    let id: MissionId = id.parse()?;
    debug!("Looking up mission {}", id);
    state
        .history
        .get(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("mission {}", id)))
}

/// Dashboard overview cards
pub async fn get_overview(State(state): State<AppState>) -> Json<Vec<OverviewStat>> {
    Json(overview_stats(&state.history, state.driver.battery().percentage))
}

// ============================================================================
// WEBSOCKET INFO
// ============================================================================

/// WebSocket connection info
pub async fn websocket_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(WebSocketInfoResponse {
        url: format!("ws://localhost:{}", state.config.ws_port),
        connected_clients: state.ws_client_count(),
        supported_events: EventType::ALL.to_vec(),
    })
}
