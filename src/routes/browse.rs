use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tokio::task::spawn_blocking;

use crate::{
    browser::listing::{self, DirectoryListing, FileContents, SlideshowListing},
    error::{validation::require_param, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

/// `GET /directory-listing?path=...`; a missing path lists the root.
pub async fn directory_listing(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> AppResult<Json<DirectoryListing>> {
    let sandbox = state.sandbox.clone();
    let path = query.path.unwrap_or_default();
    let listing = spawn_blocking(move || listing::list_directory(&sandbox, &path)).await??;
    Ok(Json(listing))
}

/// `GET /file-contents?path=...`: UTF-8 text up to `limits.max_text_bytes`.
pub async fn file_contents(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> AppResult<Json<FileContents>> {
    let path = require_param(query.path.as_deref(), "path")?.to_string();
    let sandbox = state.sandbox.clone();
    let max_bytes = state.config.limits.max_text_bytes;
    let contents = spawn_blocking(move || listing::read_text_file(&sandbox, &path, max_bytes)).await??;
    Ok(Json(contents))
}

/// `GET /slideshow-images?path=...`: image files directly inside a directory.
pub async fn slideshow_images(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> AppResult<Json<SlideshowListing>> {
    let path = require_param(query.path.as_deref(), "path")?.to_string();
    let sandbox = state.sandbox.clone();
    let media = state.media.clone();
    let images =
        spawn_blocking(move || listing::list_slideshow_images(&sandbox, &path, &media.images)).await??;
    Ok(Json(images))
}
