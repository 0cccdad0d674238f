use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::AppConfig;

/// An Axum middleware that rejects obviously malicious requests early.
///
/// This middleware checks for:
/// - Path traversal sequences in the raw request URI path (the sandbox still
///   validates every path parameter on its own).
/// - Suspicious user agents (logged only).
/// - Declared bodies larger than `limits.max_body_bytes`.
pub async fn validate_request_middleware(
    State(cfg): State<Arc<AppConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let uri_path = req.uri().path();
    if contains_path_traversal(uri_path) {
        tracing::warn!("Path traversal rejected in URI: {}", sanitize_for_logging(uri_path));
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "code": "INVALID_PATH",
                    "message": "Path traversal detected in request",
                },
                "status": 400,
            })),
        )
            .into_response();
    }

    if let Some(user_agent) = req.headers().get("user-agent") {
        if let Ok(ua_str) = user_agent.to_str() {
            if is_suspicious_user_agent(ua_str) {
                tracing::warn!("Suspicious user agent detected: {}", sanitize_for_logging(ua_str));
            }
        }
    }

    // Early rejection; DefaultBodyLimit enforces the same cap on the actual body.
    if matches!(req.method(), &axum::http::Method::POST | &axum::http::Method::PUT) {
        let declared = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        let max_body_size = cfg.limits.max_body_bytes;
        if declared.is_some_and(|length| length > max_body_size) {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "error": {
                        "code": "PAYLOAD_TOO_LARGE",
                        "message": format!("Request body exceeds maximum size of {} bytes", max_body_size),
                    },
                    "status": 413,
                })),
            )
                .into_response();
        }
    }

    next.run(req).await
}

/// Check if a URI path contains traversal attempts, plain or percent-encoded.
fn contains_path_traversal(path: &str) -> bool {
    let lower = path.to_lowercase();

    // Only whole `.` / `..` segments; `..cover.png` is an ordinary name.
    if path.split(['/', '\\']).any(|segment| segment == ".." || segment == ".") {
        return true;
    }

    // URL-encoded variants (single and double encoding)
    let encoded_patterns = [
        "%2e%2e",
        "%252e%252e", // .. and double-encoded ..
        "%2e/",
        "%252e%2f", // ./
        "/%2e",
        "%2f%2e", // /.
        "%2e\\",
        "%2e%5c", // .\\
        "%5c%2e",
        "%5c%5c", // \\.
        "%00",    // Null byte
    ];

    for pattern in &encoded_patterns {
        if lower.contains(pattern) {
            return true;
        }
    }

    path.contains('\0')
}

/// Check for suspicious user agents (simple heuristic)
fn is_suspicious_user_agent(ua: &str) -> bool {
    let ua_lower = ua.to_lowercase();
    ua_lower.contains("scanner")
        || (ua_lower.contains("crawler") && !ua_lower.contains("googlebot") && !ua_lower.contains("bingbot"))
        || ua_lower.contains("nikto")
        || ua_lower.contains("sqlmap")
        || ua_lower.contains("havij")
        || ua_lower.contains("acunetix")
}

/// Sanitizes user input for logging purposes.
///
/// This function removes control characters, limits the length of the string,
/// and escapes special characters.
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .take(200)
        .collect::<String>()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\\'")
}
