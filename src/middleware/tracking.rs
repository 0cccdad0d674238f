use axum::{
    extract::{connect_info::ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use super::ip::extract_ip_from_headers;
use super::validation::sanitize_for_logging;
use crate::tracker::RequestTracker;

/// Registers every request with the [`RequestTracker`] for its whole lifetime
/// and logs start, completion and slow requests.
///
/// The guard lives across `next.run`, so a handler that errors, panics or is
/// dropped by a disconnecting client is deregistered all the same.
pub async fn track_requests(State(tracker): State<RequestTracker>, req: Request, next: Next) -> Response {
    let remote_ip = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    let client = extract_ip_from_headers(req.headers(), remote_ip);
    let method = req.method().to_string();
    let path = sanitize_for_logging(req.uri().path());

    let guard = tracker.begin(&method, &path, client);
    tracing::info!("Request started: #{} {} {} from {}", guard.id(), method, path, client);

    let res = next.run(req).await;

    let elapsed = guard.elapsed();
    tracing::info!(
        "Request completed: #{} {} {} - {} in {:.3}s",
        guard.id(),
        method,
        path,
        res.status().as_u16(),
        elapsed.as_secs_f64()
    );
    if elapsed > tracker.slow_threshold() {
        tracing::warn!("Slow request detected: {} {} took {:.3}s", method, path, elapsed.as_secs_f64());
    }

    res
}
