//! Path containment for every client-supplied path.
//!
//! All filesystem access goes through [`Sandbox::resolve`], which turns the
//! string a client sent into a [`ValidatedPath`] that is guaranteed to lie
//! inside the configured root. Normalization is purely lexical: `.` and `..`
//! segments are folded without consulting the filesystem, so a path that does
//! not exist yet can still be checked (and answered with a 404 later).

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How paths are exchanged with clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    /// Clients send and receive full filesystem paths inside the root.
    Absolute,
    /// Clients send and receive paths relative to the root; the root itself is `""`.
    Relative,
}

#[derive(Debug, Error)]
pub enum SandboxError {
    /// The normalized path lies outside the sandbox root.
    #[error("path escapes sandbox root: {0}")]
    OutsideRoot(String),

    /// The path cannot be interpreted at all.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The configured root could not be made absolute.
    #[error("cannot resolve sandbox root {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A path that passed containment, in absolute and root-relative form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPath {
    absolute: PathBuf,
    relative: PathBuf,
}

impl ValidatedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Path relative to the sandbox root; empty for the root itself.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }

    /// Joins a single directory entry name. Names coming from `read_dir`
    /// never contain separators, so the result stays inside the root.
    pub fn child(&self, name: &str) -> ValidatedPath {
        ValidatedPath { absolute: self.absolute.join(name), relative: self.relative.join(name) }
    }
}

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    mode: PathMode,
}

impl Sandbox {
    /// Builds a sandbox around `root`, made absolute and normalized once.
    pub fn new(root: impl AsRef<Path>, mode: PathMode) -> Result<Self, SandboxError> {
        let root = root.as_ref();
        let absolute = std::path::absolute(root)
            .map_err(|source| SandboxError::Root { path: root.to_path_buf(), source })?;
        Ok(Self { root: normalize_lexically(&absolute), mode })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// Validates a client path against the root.
    ///
    /// Absolute mode takes full paths; a relative input is taken relative to the
    /// root. Relative mode ignores leading separators so `/a` and `a` mean the
    /// same entry. Either way the candidate is normalized and must equal the
    /// root or sit below it component-wise.
    pub fn resolve(&self, client_path: &str) -> Result<ValidatedPath, SandboxError> {
        if client_path.contains('\0') {
            return Err(SandboxError::InvalidPath("path contains null byte".to_string()));
        }
        // Whitespace is part of a file name; the path is taken verbatim.
        let joined = match self.mode {
            PathMode::Absolute => self.root.join(client_path),
            PathMode::Relative => self.root.join(client_path.trim_start_matches(['/', '\\'])),
        };
        let candidate = normalize_lexically(&joined);

        match relative_to_root(&self.root, &candidate) {
            Some(relative) => Ok(ValidatedPath { absolute: candidate, relative }),
            None => Err(SandboxError::OutsideRoot(client_path.to_string())),
        }
    }

    /// Client-facing rendering of a validated path in the configured mode.
    pub fn display(&self, path: &ValidatedPath) -> String {
        match self.mode {
            PathMode::Absolute => path.absolute.to_string_lossy().into_owned(),
            PathMode::Relative => to_slash(&path.relative),
        }
    }

    /// Parent of `path` in client form, `None` at the root.
    pub fn parent_of(&self, path: &ValidatedPath) -> Option<String> {
        if path.is_root() {
            return None;
        }
        let absolute = path.absolute.parent()?.to_path_buf();
        let relative = path.relative.parent().map(Path::to_path_buf).unwrap_or_default();
        Some(self.display(&ValidatedPath { absolute, relative }))
    }
}

/// Returns `candidate` relative to `root` when it is the root itself or lies
/// below it. `Path::strip_prefix` compares whole components, so `/data` is not
/// a prefix of `/data-other`.
fn relative_to_root(root: &Path, candidate: &Path) -> Option<PathBuf> {
    candidate.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Folds `.` and `..` without touching the filesystem. `..` at the top of an
/// absolute path stays at the top, like `os.path.abspath` and POSIX `cd`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_top = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_top {
                    out.pop();
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sandbox(mode: PathMode) -> Sandbox {
        Sandbox::new("/data", mode).unwrap()
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/../../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize_lexically(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_rejects_sibling_with_shared_prefix() {
        let sb = sandbox(PathMode::Absolute);
        assert!(matches!(sb.resolve("/data-other"), Err(SandboxError::OutsideRoot(_))));
        assert!(matches!(sb.resolve("/data2/x"), Err(SandboxError::OutsideRoot(_))));
        assert!(sb.resolve("/data").is_ok());
        assert!(sb.resolve("/data/").is_ok());
        assert!(sb.resolve("/data/x/y.png").is_ok());
    }

    #[test]
    fn test_both_modes_reject_same_escapes() {
        for mode in [PathMode::Absolute, PathMode::Relative] {
            let sb = sandbox(mode);
            assert!(sb.resolve("..").is_err(), "{mode:?}");
            assert!(sb.resolve("../data-other/x").is_err(), "{mode:?}");
            assert!(sb.resolve("x/../../etc/passwd").is_err(), "{mode:?}");
            assert!(sb.resolve("x/../y").is_ok(), "{mode:?}");
        }
        assert!(sandbox(PathMode::Absolute).resolve("/data/../etc").is_err());
        assert!(sandbox(PathMode::Relative).resolve("/../etc").is_err());
    }

    #[test]
    fn test_absolute_input_in_relative_mode_is_rooted() {
        let sb = sandbox(PathMode::Relative);
        let p = sb.resolve("/etc/passwd").unwrap();
        assert_eq!(p.as_path(), Path::new("/data/etc/passwd"));
        assert_eq!(sb.display(&p), "etc/passwd");
    }

    #[test]
    fn test_absolute_mode_outside_path_rejected() {
        let sb = sandbox(PathMode::Absolute);
        assert!(sb.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn test_null_byte_is_invalid() {
        let sb = sandbox(PathMode::Relative);
        assert!(matches!(sb.resolve("a\0b"), Err(SandboxError::InvalidPath(_))));
    }

    #[test]
    fn test_display_and_parent() {
        let rel = sandbox(PathMode::Relative);
        let root = rel.resolve("").unwrap();
        assert!(root.is_root());
        assert_eq!(rel.display(&root), "");
        assert_eq!(rel.parent_of(&root), None);
        let top = rel.resolve("photos").unwrap();
        assert_eq!(rel.parent_of(&top), Some(String::new()));
        let nested = rel.resolve("photos/2024").unwrap();
        assert_eq!(rel.parent_of(&nested), Some("photos".to_string()));

        let abs = sandbox(PathMode::Absolute);
        let nested = abs.resolve("/data/photos/2024").unwrap();
        assert_eq!(abs.display(&nested), "/data/photos/2024");
        assert_eq!(abs.parent_of(&nested), Some("/data/photos".to_string()));
        assert_eq!(abs.parent_of(&abs.resolve("/data").unwrap()), None);
    }

    #[test]
    fn test_whitespace_is_part_of_the_name() {
        let sb = Sandbox::new("/data", PathMode::Relative).unwrap();
        assert_eq!(sb.resolve("x.txt ").unwrap().as_path(), Path::new("/data/x.txt "));
        assert_eq!(sb.resolve(" lead.txt").unwrap().as_path(), Path::new("/data/ lead.txt"));
        assert_ne!(sb.resolve("x.txt ").unwrap(), sb.resolve("x.txt").unwrap());
    }
}
