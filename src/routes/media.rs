use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    response::Response,
};
use serde::Deserialize;
use tokio::task::spawn_blocking;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    browser::media::{join_image_path, resolve_media, MediaFile, MediaKind},
    error::{validation::require_param, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub path: Option<String>,
}

/// `GET /image/{*name}?dir=...`; `dir` defaults to the root.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ImageQuery>,
    req: Request,
) -> AppResult<Response> {
    let client_path = join_image_path(query.dir.as_deref(), &name);
    let media = resolve(&state, MediaKind::Image, client_path).await?;
    Ok(stream_file(media, req).await)
}

/// `GET /video?path=...`
pub async fn serve_video(
    State(state): State<AppState>,
    Query(query): Query<VideoQuery>,
    req: Request,
) -> AppResult<Response> {
    let client_path = require_param(query.path.as_deref(), "path")?.to_string();
    let media = resolve(&state, MediaKind::Video, client_path).await?;
    Ok(stream_file(media, req).await)
}

async fn resolve(state: &AppState, kind: MediaKind, client_path: String) -> AppResult<MediaFile> {
    let sandbox = state.sandbox.clone();
    let policy = state.media.clone();
    spawn_blocking(move || resolve_media(&sandbox, &policy, kind, &client_path)).await?
}

/// Hands the file to `ServeFile`, which sets the content type and answers
/// `Range` requests with 206 partial content.
async fn stream_file(media: MediaFile, req: Request) -> Response {
    tracing::debug!("Streaming {} ({} bytes)", media.display_path, media.size);
    match ServeFile::new(&media.path).oneshot(req).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    }
}
