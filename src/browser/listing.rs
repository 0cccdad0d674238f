use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::media::ExtensionAllowList;
use super::metadata::{describe, is_readable, FileInfo, FileKind};
use super::sandbox::{PathMode, Sandbox, SandboxError, ValidatedPath};
use crate::error::{AppError, AppResult};
use crate::middleware::validation::sanitize_for_logging;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub parent: Option<String>,
    /// Only reported in absolute mode; relative mode never leaks the server layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
    pub contents: Vec<FileInfo>,
    pub total_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContents {
    pub file_info: FileInfo,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideshowListing {
    pub path: String,
    pub images: Vec<FileInfo>,
    pub total_images: usize,
}

/// Directories first, then case-insensitive name, then exact name.
pub fn listing_order(a: &FileInfo, b: &FileInfo) -> Ordering {
    let a_dir = a.kind == FileKind::Directory;
    let b_dir = b.kind == FileKind::Directory;
    b_dir
        .cmp(&a_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn list_directory(sandbox: &Sandbox, client_path: &str) -> AppResult<DirectoryListing> {
    let dir = resolve_logged(sandbox, client_path)?;
    let path = dir.as_path();

    tracing::debug!(
        "Directory request - requested: {}, resolved: {}",
        sanitize_for_logging(client_path),
        path.display()
    );

    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound("Directory does not exist".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Err(AppError::BadRequest("Path is not a directory".to_string()));
    }

    let mut contents = read_entries(&dir, sandbox, |_, _| true)?;
    contents.sort_by(listing_order);

    Ok(DirectoryListing {
        path: sandbox.display(&dir),
        parent: sandbox.parent_of(&dir),
        root_path: match sandbox.mode() {
            PathMode::Absolute => Some(sandbox.root().to_string_lossy().into_owned()),
            PathMode::Relative => None,
        },
        total_items: contents.len(),
        contents,
    })
}

pub fn read_text_file(sandbox: &Sandbox, client_path: &str, max_bytes: u64) -> AppResult<FileContents> {
    let file = resolve_logged(sandbox, client_path)?;
    let path = file.as_path();

    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound("File does not exist".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        return Err(AppError::BadRequest("Path is a directory".to_string()));
    }
    if !is_readable(path) {
        return Err(AppError::PermissionDenied("Permission denied".to_string()));
    }

    let file_info = describe(path, sandbox.display(&file))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cannot stat {}", path.display())))?;

    if file_info.size.unwrap_or(0) > max_bytes {
        return Err(AppError::PayloadTooLarge {
            message: "File too large to display".to_string(),
            details: Some(json!({ "file_info": file_info, "max_bytes": max_bytes })),
        });
    }

    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(FileContents { file_info, content }),
        Err(_) => Err(AppError::BadRequestWithDetails {
            message: "File is not a text file".to_string(),
            details: json!({ "file_info": file_info }),
        }),
    }
}

pub fn list_slideshow_images(
    sandbox: &Sandbox,
    client_path: &str,
    images: &ExtensionAllowList,
) -> AppResult<SlideshowListing> {
    let dir = resolve_logged(sandbox, client_path)?;
    if !dir.as_path().is_dir() {
        return Err(AppError::NotFound("Directory does not exist".to_string()));
    }

    // is_file follows symlinks, so a link to an image still counts.
    let mut found =
        read_entries(&dir, sandbox, |entry, name| images.allows_name(name) && entry.path().is_file())?;
    found.sort_by(|a, b| {
        a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.name.cmp(&b.name))
    });

    Ok(SlideshowListing { path: sandbox.display(&dir), total_images: found.len(), images: found })
}

pub(crate) fn resolve_logged(sandbox: &Sandbox, client_path: &str) -> AppResult<ValidatedPath> {
    sandbox.resolve(client_path).map_err(|e| {
        if matches!(e, SandboxError::OutsideRoot(_)) {
            tracing::warn!(
                "Security check failed - requested: {}, root: {}",
                sanitize_for_logging(client_path),
                sandbox.root().display()
            );
        }
        AppError::from(e)
    })
}

/// Enumerates `dir`, describing every entry accepted by `keep`. Entries that
/// cannot be described are skipped.
fn read_entries<F>(dir: &ValidatedPath, sandbox: &Sandbox, keep: F) -> AppResult<Vec<FileInfo>>
where
    F: Fn(&fs::DirEntry, &str) -> bool,
{
    let entries = match fs::read_dir(dir.as_path()) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(AppError::PermissionDenied("Permission denied".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.as_path().display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !keep(&entry, &name) {
            continue;
        }
        let child = dir.child(&name);
        if let Some(info) = describe(child.as_path(), sandbox.display(&child)) {
            out.push(info);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, kind: FileKind) -> FileInfo {
        FileInfo {
            name: name.to_string(),
            path: name.to_string(),
            kind,
            size: None,
            permissions: "644".into(),
            modified: String::new(),
            readable: true,
        }
    }

    #[test]
    fn test_listing_order() {
        let mut items = vec![
            info("b.txt", FileKind::File),
            info("A", FileKind::Directory),
            info("a.txt", FileKind::File),
            info("Z", FileKind::Directory),
            info("link", FileKind::Symlink),
            info("B.txt", FileKind::File),
        ];
        items.sort_by(listing_order);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Z", "a.txt", "B.txt", "b.txt", "link"]);
    }
}
