//! # GCS Telemetry - Metrics & Observability
//!
//! Prometheus metrics exporter for the ground-control station.
//! Provides real-time metrics for:
//! - Simulation ticks and mission lifecycle
//! - Drone battery, altitude and speed
//! - Site detections by category
//! - WebSocket connections and API traffic

use gcs_core::{Event, EventPayload, MissionStatus, SiteCategory, TelemetryFrame};
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tracing::{debug, info};

/// Metrics collector for the ground-control station
pub struct MetricsCollector {
    registry: Registry,

    // Engine metrics
    sim_ticks: IntCounter,
    mission_active: IntGauge,
    missions_completed: IntCounterVec,
    location_fallbacks: IntCounter,

    // Drone metrics
    battery_percent: Gauge,
    battery_voltage: Gauge,
    altitude: Gauge,
    speed: Gauge,
    detections: IntCounterVec,

    // WebSocket metrics
    ws_connections: IntGauge,

    // API metrics
    api_requests_total: IntCounterVec,
    api_request_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let sim_ticks = IntCounter::new("gcs_sim_ticks_total", "Simulation ticks processed")?;
        registry.register(Box::new(sim_ticks.clone()))?;

        let mission_active = IntGauge::new("gcs_mission_active", "Whether a mission is currently active")?;
        registry.register(Box::new(mission_active.clone()))?;

        let missions_completed = IntCounterVec::new(
            Opts::new("gcs_missions_completed_total", "Missions ended, by final status"),
            &["status"],
        )?;
        registry.register(Box::new(missions_completed.clone()))?;

        let location_fallbacks = IntCounter::new(
            "gcs_location_fallbacks_total",
            "Mission starts that fell back to the default home",
        )?;
        registry.register(Box::new(location_fallbacks.clone()))?;

        let battery_percent = Gauge::new("gcs_battery_percent", "Drone battery level")?;
        registry.register(Box::new(battery_percent.clone()))?;

        let battery_voltage = Gauge::new("gcs_battery_voltage_volts", "Drone battery pack voltage")?;
        registry.register(Box::new(battery_voltage.clone()))?;

        let altitude = Gauge::new("gcs_altitude_meters", "Drone altitude in meters")?;
        registry.register(Box::new(altitude.clone()))?;

        let speed = Gauge::new("gcs_speed_mps", "Drone ground speed in m/s")?;
        registry.register(Box::new(speed.clone()))?;

        let detections = IntCounterVec::new(
            Opts::new("gcs_detections_total", "Site detections by category"),
            &["category"],
        )?;
        registry.register(Box::new(detections.clone()))?;

        let ws_connections = IntGauge::new("gcs_ws_connections", "Active WebSocket connections")?;
        registry.register(Box::new(ws_connections.clone()))?;

        let api_requests_total = IntCounterVec::new(
            Opts::new("gcs_api_requests_total", "API requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new("gcs_api_request_duration_seconds", "API request duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        // Pre-create label series so they export as zero
        for category in SiteCategory::ALL {
            detections.with_label_values(&[category.as_str()]);
        }

        info!("Metrics collector initialized");

        Ok(Self {
            registry,
            sim_ticks,
            mission_active,
            missions_completed,
            location_fallbacks,
            battery_percent,
            battery_voltage,
            altitude,
            speed,
            detections,
            ws_connections,
            api_requests_total,
            api_request_duration,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    // ========================================================================
    // ENGINE METRICS
    // ========================================================================

    /// Fold one engine event into the metrics
    pub fn record_event(&self, event: &Event) {
        match &event.payload {
            EventPayload::Mission(_) => self.set_mission_active(true),
            EventPayload::Telemetry(frame) => {
                self.sim_ticks.inc();
                self.observe_frame(frame);
            }
            EventPayload::Detection(detected) => {
                self.record_detection(detected.detection.category);
            }
            EventPayload::Summary(summary) => {
                self.set_mission_active(false);
                self.record_mission_completed(summary.status());
            }
            EventPayload::Home(_) | EventPayload::Battery(_) => {}
        }
    }

    /// Update drone gauges from a telemetry frame
    pub fn observe_frame(&self, frame: &TelemetryFrame) {
        self.battery_percent.set(frame.battery.percentage);
        self.battery_voltage.set(frame.battery.voltage_volts);
        self.altitude.set(frame.altitude);
        self.speed.set(frame.speed);
    }

    /// Set mission active status
    pub fn set_mission_active(&self, active: bool) {
        self.mission_active.set(if active { 1 } else { 0 });
    }

    pub fn record_detection(&self, category: SiteCategory) {
        self.detections.with_label_values(&[category.as_str()]).inc();
        debug!("Detection counted: {}", category);
    }

    pub fn record_mission_completed(&self, status: MissionStatus) {
        self.missions_completed
            .with_label_values(&[&status.to_string()])
            .inc();
    }

    /// Bring the fallback counter up to the engine's running total
    pub fn sync_location_fallbacks(&self, total: u64) {
        let current = self.location_fallbacks.get();
        if total > current {
            self.location_fallbacks.inc_by(total - current);
        }
    }

    // ========================================================================
    // WEBSOCKET METRICS
    // ========================================================================

    /// Set WebSocket connection count
    pub fn set_ws_connections(&self, count: i64) {
        self.ws_connections.set(count);
    }

    // ========================================================================
    // API METRICS
    // ========================================================================

    /// Record API request
    pub fn record_api_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.api_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.api_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gcs_core::{DetectionEvent, GeoPoint, MissionSummary, TelemetrySnapshot, FALLBACK_HOME};

    #[test]
    fn test_metrics_creation() {
        let metrics = MetricsCollector::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_metrics_export() {
        let metrics = MetricsCollector::new().unwrap();

        metrics.set_ws_connections(5);
        metrics.set_mission_active(true);

        let export = metrics.export().unwrap();
        assert!(export.contains("gcs_ws_connections 5"));
        assert!(export.contains("gcs_mission_active 1"));
        assert!(export.contains("gcs_detections_total{category=\"Enclosed\"} 0"));
    }

    #[test]
    fn test_telemetry_event_updates_gauges() {
        let metrics = MetricsCollector::new().unwrap();
        let snapshot = TelemetrySnapshot::quiescent(FALLBACK_HOME, 87.5);

        metrics.record_event(&Event::telemetry_updated(snapshot.frame()));

        let export = metrics.export().unwrap();
        assert!(export.contains("gcs_sim_ticks_total 1"));
        assert!(export.contains("gcs_battery_percent 87.5"));
    }

    #[test]
    fn test_detection_and_mission_end() {
        let metrics = MetricsCollector::new().unwrap();
        let detection = DetectionEvent::new(SiteCategory::Open, "Stagnant Ponds");
        metrics.record_event(&Event::site_detected(detection, 13, GeoPoint::new(1.0, 2.0)));

        let summary = MissionSummary {
            flight_time: "00:13".to_string(),
            elapsed_seconds: 13,
            home: FALLBACK_HOME,
            flight_path: Vec::new(),
            bounds: None,
            distance_flown_m: 0.0,
            detections: Vec::new(),
            final_battery_percent: 0.0,
        };
        metrics.record_event(&Event::mission_ended(summary));

        let export = metrics.export().unwrap();
        assert!(export.contains("gcs_detections_total{category=\"Open\"} 1"));
        assert!(export.contains("gcs_missions_completed_total{status=\"Interrupted\"} 1"));
        assert!(export.contains("gcs_mission_active 0"));
    }

    #[test]
    fn test_sync_location_fallbacks() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.sync_location_fallbacks(2);
        metrics.sync_location_fallbacks(2);
        metrics.sync_location_fallbacks(3);
        assert!(metrics.export().unwrap().contains("gcs_location_fallbacks_total 3"));
    }
}
