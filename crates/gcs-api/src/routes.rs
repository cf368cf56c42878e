//! API route definitions

use crate::handlers;
use crate::state::AppState;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:8080"))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::system_status))

        // Metrics (Prometheus format)
        .route("/metrics", get(handlers::metrics))

        // Telemetry API
        .route("/api/v1/telemetry", get(handlers::get_telemetry))
        .route("/api/v1/events", get(handlers::recent_events))
        .route("/api/v1/clock", get(handlers::get_clock))

        // Mission API
        .route("/api/v1/mission/start", post(handlers::start_mission))
        .route("/api/v1/mission/end", post(handlers::end_mission))
        .route("/api/v1/missions", get(handlers::list_missions))
        .route("/api/v1/missions/{id}", get(handlers::get_mission))
        .route("/api/v1/overview", get(handlers::get_overview))

        // WebSocket info
        .route("/api/v1/ws/info", get(handlers::websocket_info))

        // Apply middleware
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Count and time every request by its route template
async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let started = Instant::now();

    let response = next.run(request).await;

    state.metrics.record_api_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, StatusCode};
    use gcs_core::{MissionRecord, TelemetrySnapshot};
    use gcs_sim::SimConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = ApiConfig {
            sim: SimConfig::seeded(3),
            ..Default::default()
        };
        AppState::new(config).unwrap()
    }

    async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state());
        let (status, body) = call(&app, Method::GET, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_idle_telemetry() {
        let app = create_router(test_state());
        let (status, body) = call(&app, Method::GET, "/api/v1/telemetry").await;

        assert_eq!(status, StatusCode::OK);
        let snapshot: TelemetrySnapshot = serde_json::from_slice(&body).unwrap();
        assert!(!snapshot.armed_state);
        assert!(snapshot.flight_path.is_empty());
    }

    #[tokio::test]
    async fn test_mission_lifecycle() {
        let state = test_state();
        let app = create_router(state.clone());

        let (status, body) = call(&app, Method::POST, "/api/v1/mission/start").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let snapshot: TelemetrySnapshot = serde_json::from_slice(&body).unwrap();
        assert!(snapshot.armed_state);

        let (status, _) = call(&app, Method::POST, "/api/v1/mission/start").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, Method::POST, "/api/v1/mission/end").await;
        assert_eq!(status, StatusCode::OK);
        let record: MissionRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(record.name, "Mission #1");
        assert_eq!(record.location, "Sector 7G");

        let (status, body) = call(&app, Method::POST, "/api/v1/mission/end").await;
        assert_eq!(status, StatusCode::CONFLICT);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "conflict");

        let (status, body) = call(&app, Method::GET, &format!("/api/v1/missions/{}", record.id)).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: MissionRecord = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched.id, record.id);

        let (_, body) = call(&app, Method::GET, "/api/v1/missions").await;
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total"], 1);
    }

    #[tokio::test]
    async fn test_status_reports_engine_and_hub() {
        let app = create_router(test_state());
        let (status, body) = call(&app, Method::GET, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["mission_active"], false);
        assert_eq!(json["websocket_clients"], 0);
        assert_eq!(json["websocket_events_broadcast"], 0);
    }

    #[tokio::test]
    async fn test_unknown_mission() {
        let app = create_router(test_state());

        let (status, _) = call(&app, Method::GET, "/api/v1/missions/not-a-uuid").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = gcs_core::MissionId::new();
        let (status, _) = call(&app, Method::GET, &format!("/api/v1/missions/{}", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_overview_and_clock() {
        let app = create_router(test_state());

        let (status, body) = call(&app, Method::GET, "/api/v1/overview").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json[0]["value"], "0 Flights");
        assert_eq!(json[2]["subtext"], "Healthy");

        let (status, body) = call(&app, Method::GET, "/api/v1/clock").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["time"].as_str().unwrap().ends_with('M'));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_counts_requests() {
        let app = create_router(test_state());

        call(&app, Method::GET, "/health").await;
        let (status, body) = call(&app, Method::GET, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("gcs_battery_percent"));
        assert!(text.contains(r#"gcs_api_requests_total{method="GET",path="/health",status="200"} 1"#));
    }

    #[tokio::test]
    async fn test_recent_events_after_start() {
        let state = test_state();
        let app = create_router(state.clone());

        call(&app, Method::POST, "/api/v1/mission/start").await;
        let (status, body) =
            call(&app, Method::GET, "/api/v1/events?event_type=MISSION_STARTED").await;
        state.driver.stop();

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["event_type"], "MISSION_STARTED");
    }
}
