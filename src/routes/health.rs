use crate::{state::AppState, tracker::round_secs};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

// Liveness plus the in-flight request summary. The health request itself is
// always counted.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let tracker = &state.tracker;
    let snapshot = tracker.snapshot();
    let long_running = snapshot.long_running(tracker.long_running_threshold());
    if long_running > 0 {
        tracing::warn!(
            "{} request(s) active for more than {}s",
            long_running,
            tracker.long_running_threshold().as_secs()
        );
    }

    Json(json!({
        "status": "healthy",
        "active_requests": snapshot.active_count,
        "oldest_request_age": snapshot.oldest_age.map(round_secs),
        "long_running_requests": long_running,
        "uptime": round_secs(tracker.uptime()),
    }))
}

// Every in-flight request with its age, oldest first.
pub async fn active_requests(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.tracker.snapshot();
    Json(json!({
        "active_requests": snapshot.requests,
        "total_active": snapshot.active_count,
    }))
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
