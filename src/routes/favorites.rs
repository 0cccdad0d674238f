use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use tokio::task::spawn_blocking;

use crate::{
    browser::archive::{build_archive, ArchiveStream},
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct FavoritesRequest {
    pub files: Option<Vec<String>>,
}

/// `POST /download-favorites` with `{"files": [...]}`: streams a zip of the
/// listed files renamed `0001.ext`, `0002.ext`, ... plus `file_mapping.json`.
pub async fn download_favorites(
    State(state): State<AppState>,
    payload: Result<Json<FavoritesRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(req) = payload?;
    let files = req.files.ok_or_else(|| AppError::BadRequest("Files list required".to_string()))?;
    if files.is_empty() {
        return Err(AppError::BadRequest("At least one file required".to_string()));
    }

    let requested = files.len();
    let sandbox = state.sandbox.clone();
    let archive = spawn_blocking(move || build_archive(&sandbox, &files)).await??;
    let bundled = archive.entry_count();
    tracing::info!("Favorites archive ready: {} of {} files bundled", bundled, requested);

    // From here on the temporary file is owned by the response body.
    let stream = ArchiveStream::new(archive)?;

    let filename = format!("attachment; filename=\"favorites-{}.zip\"", Local::now().format("%Y%m%d-%H%M%S"));
    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    if let Ok(value) = HeaderValue::from_str(&filename) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(HeaderName::from_static("x-archive-entries"), HeaderValue::from(bundled));
    Ok(response)
}
