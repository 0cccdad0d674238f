use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::listing::resolve_logged;
use super::metadata::is_readable;
use super::sandbox::Sandbox;
use crate::config::MediaConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::validation::sanitize_for_logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    fn with_article(self) -> &'static str {
        match self {
            MediaKind::Image => "an image",
            MediaKind::Video => "a video",
        }
    }
}

/// Case-insensitive set of allowed file extensions (stored without the dot).
#[derive(Debug, Clone)]
pub struct ExtensionAllowList {
    extensions: Vec<String>,
}

impl ExtensionAllowList {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn allows(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }

    pub fn allows_name(&self, name: &str) -> bool {
        self.allows(Path::new(name))
    }

    /// Human-readable list, e.g. `.jpg, .png`.
    pub fn describe(&self) -> String {
        self.extensions.iter().map(|e| format!(".{e}")).collect::<Vec<_>>().join(", ")
    }
}

/// Allow-lists for every streamable media kind.
#[derive(Debug, Clone)]
pub struct MediaPolicy {
    pub images: ExtensionAllowList,
    pub videos: ExtensionAllowList,
}

impl MediaPolicy {
    pub fn from_config(cfg: &MediaConfig) -> Self {
        Self {
            images: ExtensionAllowList::new(&cfg.image_extensions),
            videos: ExtensionAllowList::new(&cfg.video_extensions),
        }
    }

    pub fn allow_list(&self, kind: MediaKind) -> &ExtensionAllowList {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }
}

/// A media file that passed every check and may be streamed.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub display_path: String,
    pub size: u64,
}

/// Builds the client path for `/image/{name}?dir=...`.
pub fn join_image_path(dir: Option<&str>, name: &str) -> String {
    match dir.filter(|d| !d.trim().is_empty()) {
        Some(d) => format!("{}/{}", d.trim_end_matches(['/', '\\']), name.trim_start_matches(['/', '\\'])),
        None => name.to_string(),
    }
}

/// Validates a media request: containment (403), existence as a regular file
/// (404), readability (403), then the extension allow-list (400).
pub fn resolve_media(
    sandbox: &Sandbox,
    policy: &MediaPolicy,
    kind: MediaKind,
    client_path: &str,
) -> AppResult<MediaFile> {
    let file = resolve_logged(sandbox, client_path)?;
    let path = file.as_path();
    let label = kind.label();

    let meta = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            tracing::warn!("{} is not a regular file: {}", label, sanitize_for_logging(client_path));
            return Err(AppError::NotFound("File does not exist".to_string()));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!("{} file not found: {}", label, sanitize_for_logging(client_path));
            return Err(AppError::NotFound("File does not exist".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if !is_readable(path) {
        tracing::warn!("Permission denied for {}: {}", label, sanitize_for_logging(client_path));
        return Err(AppError::PermissionDenied("Permission denied".to_string()));
    }

    let allowed = policy.allow_list(kind);
    if !allowed.allows(path) {
        tracing::warn!(
            "Not {} file: {} (allowed: {})",
            kind.with_article(),
            sanitize_for_logging(client_path),
            allowed.describe()
        );
        return Err(AppError::BadRequestWithDetails {
            message: format!("Not {} file. Allowed extensions: {}", kind.with_article(), allowed.describe()),
            details: json!({ "allowed_extensions": allowed.describe() }),
        });
    }

    let display_path = sandbox.display(&file);
    tracing::info!("Serving {}: {} ({} bytes)", label, sanitize_for_logging(&display_path), meta.len());

    Ok(MediaFile { path: path.to_path_buf(), display_path, size: meta.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::sandbox::PathMode;
    use tempfile::TempDir;

    fn policy() -> MediaPolicy {
        MediaPolicy::from_config(&crate::config::AppConfig::default().media)
    }

    #[test]
    fn test_allow_list_case_insensitive() {
        let list = ExtensionAllowList::new([".JPG", "png"]);
        assert!(list.allows_name("photo.jpg"));
        assert!(list.allows_name("PHOTO.JPG"));
        assert!(list.allows_name("x.Png"));
        assert!(!list.allows_name("x.gif"));
        assert!(!list.allows_name("jpg"));
        assert_eq!(list.describe(), ".jpg, .png");
    }

    #[test]
    fn test_default_allow_lists() {
        let p = policy();
        for ext in ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"] {
            assert!(p.images.allows_name(&format!("a.{ext}")), "{ext}");
        }
        for ext in ["mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", "m4v", "3gp", "ogv"] {
            assert!(p.videos.allows_name(&format!("a.{ext}")), "{ext}");
        }
        assert!(!p.videos.allows_name("a.png"));
    }

    #[test]
    fn test_join_image_path() {
        assert_eq!(join_image_path(None, "a.jpg"), "a.jpg");
        assert_eq!(join_image_path(Some(""), "a.jpg"), "a.jpg");
        assert_eq!(join_image_path(Some("album/"), "a.jpg"), "album/a.jpg");
        assert_eq!(join_image_path(Some("/srv/m/album"), "a.jpg"), "/srv/m/album/a.jpg");
    }

    #[test]
    fn test_resolve_media_checks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("clip.MP4"), b"0123456789").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("movie.mp4")).unwrap();
        let sb = Sandbox::new(dir.path(), PathMode::Relative).unwrap();
        let p = policy();

        let ok = resolve_media(&sb, &p, MediaKind::Video, "clip.MP4").unwrap();
        assert_eq!(ok.size, 10);
        assert_eq!(ok.display_path, "clip.MP4");

        let err = resolve_media(&sb, &p, MediaKind::Video, "notes.txt").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        let err = resolve_media(&sb, &p, MediaKind::Video, "missing.mp4").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        let err = resolve_media(&sb, &p, MediaKind::Video, "movie.mp4").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
        let err = resolve_media(&sb, &p, MediaKind::Image, "../outside.png").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
