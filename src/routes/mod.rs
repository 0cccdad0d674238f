//! HTTP route handlers for the dirwarden API.
//!
//! - `browse`: directory listings, text file contents, slideshow image lists
//! - `media`: image and video streaming
//! - `favorites`: zip export of selected files
//! - `health`: health report, active request dump, version info

pub mod browse;
pub mod favorites;
pub mod health;
pub mod media;

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::{
    error::AppError,
    middleware::{
        security_headers::security_headers_middleware, tracking::track_requests,
        validation::validate_request_middleware,
    },
    state::AppState,
};

/// Builds the API router with its middleware stack. Transport concerns
/// (tracing spans, compression, CORS) are layered on by the binary.
pub fn router(state: AppState) -> Router {
    let cfg = state.config.clone();

    let api = Router::new()
        .route("/directory-listing", get(browse::directory_listing))
        .route("/file-contents", get(browse::file_contents))
        .route("/slideshow-images", get(browse::slideshow_images))
        .route("/image/{*name}", get(media::serve_image))
        .route("/video", get(media::serve_video))
        .route("/download-favorites", post(favorites::download_favorites))
        .route("/health", get(health::health))
        .route("/debug/active-requests", get(health::active_requests))
        .route("/version", get(health::version));

    let api = match cfg.server.static_dir.as_deref().filter(|d| Path::new(d).is_dir()) {
        Some(dir) => api.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => api.fallback(not_found),
    };

    api.with_state(state.clone())
        .layer(DefaultBodyLimit::max(cfg.limits.max_body_bytes))
        .layer(from_fn_with_state(cfg.clone(), validate_request_middleware))
        .layer(from_fn_with_state(state.tracker.clone(), track_requests))
        .layer(from_fn_with_state(cfg, security_headers_middleware))
}

async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}
