//! Sandboxed filesystem access.
//!
//! - [`sandbox`]: containment of client paths below the configured root
//! - [`metadata`]: per-entry metadata (`FileInfo`)
//! - [`listing`]: directory listings, text file contents and slideshow images
//! - [`media`]: extension allow-lists and validation for streamed media
//! - [`archive`]: zip export of favorites with a renaming manifest
//!
//! Everything here is synchronous; HTTP handlers run it on the blocking pool.

pub mod archive;
pub mod listing;
pub mod media;
pub mod metadata;
pub mod sandbox;

pub use sandbox::{PathMode, Sandbox, SandboxError, ValidatedPath};
