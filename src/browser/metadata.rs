use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::middleware::validation::sanitize_for_logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// Metadata of one filesystem entry as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// `None` for directories.
    pub size: Option<u64>,
    /// Low three octal digits of the mode, e.g. `"644"`.
    pub permissions: String,
    pub modified: String,
    pub readable: bool,
}

/// Describes the entry at `path`, reporting it under `display_path`.
///
/// Returns `None` when the entry cannot be stat'ed (vanished, broken symlink,
/// permission denied); callers treat that as "entry unavailable".
pub fn describe(path: &Path, display_path: String) -> Option<FileInfo> {
    let link_meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Error accessing {}: {}", sanitize_for_logging(&path.to_string_lossy()), e);
            return None;
        }
    };
    let meta = if link_meta.file_type().is_symlink() {
        match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(
                    "Error following symlink {}: {}",
                    sanitize_for_logging(&path.to_string_lossy()),
                    e
                );
                return None;
            }
        }
    } else {
        link_meta.clone()
    };

    let kind = if link_meta.file_type().is_symlink() {
        FileKind::Symlink
    } else if meta.is_dir() {
        FileKind::Directory
    } else {
        FileKind::File
    };
    let size = if meta.is_dir() { None } else { Some(meta.len()) };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    Some(FileInfo {
        name,
        path: display_path,
        kind,
        size,
        permissions: permission_bits(&meta),
        modified: meta.modified().map(format_timestamp).unwrap_or_default(),
        readable: is_readable(path),
    })
}

pub fn format_timestamp(t: SystemTime) -> String {
    DateTime::<Local>::from(t).to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:03o}", meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> String {
    if meta.permissions().readonly() { "444".to_string() } else { "666".to_string() }
}

/// Explicit read-access check for the current process, independent of stat.
#[cfg(unix)]
pub fn is_readable(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::R_OK).is_ok()
}

#[cfg(not(unix))]
pub fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, b"hello").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let info = describe(&file, "notes.txt".to_string()).unwrap();
        assert_eq!(info.name, "notes.txt");
        assert_eq!(info.path, "notes.txt");
        assert_eq!(info.kind, FileKind::File);
        assert_eq!(info.size, Some(5));
        assert_eq!(info.permissions.len(), 3);
        assert!(info.readable);
        assert!(DateTime::parse_from_rfc3339(&info.modified).is_ok());

        let info = describe(&dir.path().join("sub"), "sub".to_string()).unwrap();
        assert_eq!(info.kind, FileKind::Directory);
        assert_eq!(info.size, None);
    }

    #[test]
    fn test_describe_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(describe(&dir.path().join("gone"), "gone".to_string()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.bin");
        fs::write(&target, [0u8; 8]).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("broken")).unwrap();

        let info = describe(&dir.path().join("link"), "link".to_string()).unwrap();
        assert_eq!(info.kind, FileKind::Symlink);
        assert_eq!(info.size, Some(8));

        assert!(describe(&dir.path().join("broken"), "broken".to_string()).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_bits() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x");
        fs::write(&file, b"").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();
        let info = describe(&file, "x".to_string()).unwrap();
        assert_eq!(info.permissions, "640");
    }

    #[test]
    fn test_serialized_shape() {
        let info = FileInfo {
            name: "a".into(),
            path: "a".into(),
            kind: FileKind::Directory,
            size: None,
            permissions: "755".into(),
            modified: "2024-01-01T00:00:00+00:00".into(),
            readable: true,
        };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["type"], "directory");
        assert!(v["size"].is_null());
    }
}
