//! Event types for the ground-control system
//!
//! These events are published by the simulation engine and streamed to
//! dashboard clients via WebSocket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DetectionEvent, GeoPoint, MissionSummary, TelemetryFrame, TelemetrySnapshot};

/// Event envelope for all engine events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            payload,
        }
    }

    pub fn mission_started(home: GeoPoint, battery_percent: f64) -> Self {
        Self::new(
            EventType::MissionStarted,
            EventPayload::Mission(MissionEvent {
                home,
                battery_percent,
            }),
        )
    }

    pub fn telemetry_updated(frame: TelemetryFrame) -> Self {
        Self::new(
            EventType::TelemetryUpdated,
            EventPayload::Telemetry(Box::new(frame)),
        )
    }

    pub fn site_detected(detection: DetectionEvent, elapsed_seconds: u64, position: GeoPoint) -> Self {
        Self::new(
            EventType::SiteDetected,
            EventPayload::Detection(SiteDetectedEvent {
                detection,
                elapsed_seconds,
                position,
            }),
        )
    }

    pub fn home_resolved(home: GeoPoint) -> Self {
        Self::new(
            EventType::HomePositionResolved,
            EventPayload::Home(HomeEvent { home }),
        )
    }

    pub fn battery_low(percentage: f64, threshold: f64) -> Self {
        Self::new(
            EventType::BatteryLow,
            EventPayload::Battery(BatteryEvent {
                percentage,
                threshold,
            }),
        )
    }

    pub fn mission_ended(summary: MissionSummary) -> Self {
        Self::new(
            EventType::MissionEnded,
            EventPayload::Summary(Box::new(summary)),
        )
    }
}

/// Type of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    MissionStarted,
    TelemetryUpdated,
    SiteDetected,
    HomePositionResolved,
    BatteryLow,
    MissionEnded,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::MissionStarted,
        EventType::TelemetryUpdated,
        EventType::SiteDetected,
        EventType::HomePositionResolved,
        EventType::BatteryLow,
        EventType::MissionEnded,
    ];
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    Mission(MissionEvent),
    Telemetry(Box<TelemetryFrame>),
    Detection(SiteDetectedEvent),
    Home(HomeEvent),
    Battery(BatteryEvent),
    Summary(Box<MissionSummary>),
}

/// Mission start event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionEvent {
    pub home: GeoPoint,
    pub battery_percent: f64,
}

/// Rising edge of the site detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDetectedEvent {
    pub detection: DetectionEvent,
    pub elapsed_seconds: u64,
    pub position: GeoPoint,
}

/// Late home-position fix from the location provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeEvent {
    pub home: GeoPoint,
}

/// Battery dropped under the warning threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryEvent {
    pub percentage: f64,
    pub threshold: f64,
}

// ============================================================================
// WEBSOCKET MESSAGE TYPES
// ============================================================================

/// Message sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Current snapshot, sent on connection and on request
    Snapshot(Box<TelemetrySnapshot>),
    /// Event update
    Event(Event),
    /// Error message
    Error { code: String, message: String },
    /// Heartbeat/ping
    Ping { timestamp: i64 },
}

/// Message sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Receive only these event types (None = all)
    Subscribe { event_types: Option<Vec<EventType>> },
    /// Stop receiving these event types (None = all)
    Unsubscribe { event_types: Option<Vec<EventType>> },
    /// Request current snapshot
    GetSnapshot,
    /// Start or end the mission
    Command(MissionCommand),
    /// Client heartbeat
    Ping { timestamp: i64 },
}

/// Lifecycle command issued from the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionCommand {
    Start,
    End,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SiteCategory, FALLBACK_HOME};

    #[test]
    fn test_event_creation() {
        let event = Event::mission_started(FALLBACK_HOME, 98.7);
        assert_eq!(event.event_type, EventType::MissionStarted);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::site_detected(
            DetectionEvent::new(SiteCategory::Enclosed, "Flower Pots"),
            11,
            FALLBACK_HOME,
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event_type, EventType::SiteDetected);
        assert!(json.contains("Flower Pots"));
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Command","payload":"START"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Command(MissionCommand::Start)));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"GetSnapshot"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetSnapshot));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Ping","payload":{"timestamp":7}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping { timestamp: 7 }));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"Subscribe","payload":{"event_types":["SITE_DETECTED"]}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe { event_types: Some(ref t) } if t == &[EventType::SiteDetected]
        ));
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Ping { timestamp: 12345 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("Ping"));
    }
}
