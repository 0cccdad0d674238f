//! Favorites export: bundles a list of files into one zip archive.
//!
//! Entries are renamed to their 1-based position among the bundled files
//! (`0001.jpg`, `0002.png`, ...) and a `file_mapping.json` manifest maps every
//! generated name back to where the file came from. The archive is built in a
//! temporary file which lives exactly as long as the [`ArchiveStream`] that
//! sends it.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::Context as _;
use bytes::Bytes;
use chrono::{Datelike, Timelike};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempPath};
use tokio_util::io::ReaderStream;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::sandbox::{Sandbox, ValidatedPath};
use crate::error::{AppError, AppResult};
use crate::middleware::validation::sanitize_for_logging;

pub const MANIFEST_NAME: &str = "file_mapping.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub original_path: String,
    pub original_name: String,
    pub sequence: u32,
}

/// Generated entry name -> origin. Zero-padded names keep the map in sequence order.
pub type ArchiveManifest = BTreeMap<String, ManifestEntry>;

/// A finished archive waiting to be streamed.
#[derive(Debug)]
pub struct BuiltArchive {
    pub file: NamedTempFile,
    pub manifest: ArchiveManifest,
    pub skipped: Vec<String>,
}

impl BuiltArchive {
    pub fn entry_count(&self) -> usize {
        self.manifest.len()
    }
}

/// `{sequence:04}` plus the source extension, dot included.
pub fn entry_name(sequence: u32, source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("{:04}.{}", sequence, ext.to_string_lossy()),
        None => format!("{:04}", sequence),
    }
}

/// Validates every path first; one escape rejects the whole request.
fn validate_all(sandbox: &Sandbox, files: &[String]) -> AppResult<Vec<ValidatedPath>> {
    files
        .iter()
        .map(|f| {
            sandbox.resolve(f).map_err(|e| {
                tracing::warn!("Access denied for file in favorites download: {}", sanitize_for_logging(f));
                AppError::from(e)
            })
        })
        .collect()
}

pub fn build_archive(sandbox: &Sandbox, files: &[String]) -> AppResult<BuiltArchive> {
    if files.is_empty() {
        return Err(AppError::BadRequest("At least one file required".to_string()));
    }
    let validated = validate_all(sandbox, files)?;

    let mut temp = tempfile::Builder::new()
        .prefix("favorites-")
        .suffix(".zip")
        .tempfile()
        .context("Failed to create temporary archive")?;

    let mut manifest = ArchiveManifest::new();
    let mut skipped = Vec::new();
    {
        let mut zip = ZipWriter::new(temp.as_file_mut());
        let options = entry_options();
        let mut sequence = 0u32;

        for (client_path, file) in files.iter().zip(&validated) {
            let path = file.as_path();
            if !fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) {
                tracing::warn!("File not found or not accessible: {}", sanitize_for_logging(client_path));
                skipped.push(client_path.clone());
                continue;
            }
            let mut source = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("Cannot open {} for archiving: {}", sanitize_for_logging(client_path), e);
                    skipped.push(client_path.clone());
                    continue;
                }
            };

            sequence += 1;
            let name = entry_name(sequence, path);
            zip.start_file(name.as_str(), options).context("Failed to start archive entry")?;
            io::copy(&mut source, &mut zip).context("Failed to write archive entry")?;

            let original_path = relative_slash(file);
            tracing::info!("Added to ZIP: {} as {}", sanitize_for_logging(&original_path), name);
            manifest.insert(
                name,
                ManifestEntry {
                    original_name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    original_path,
                    sequence,
                },
            );
        }

        zip.start_file(MANIFEST_NAME, options).context("Failed to start manifest entry")?;
        let manifest_json = serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;
        zip.write_all(&manifest_json).context("Failed to write manifest")?;
        zip.finish().context("Failed to finalize archive")?;
    }

    Ok(BuiltArchive { file: temp, manifest, skipped })
}

fn entry_options() -> FileOptions<'static, ()> {
    let now = chrono::Local::now();
    FileOptions::default().compression_method(CompressionMethod::Deflated).last_modified_time(
        zip::DateTime::from_date_and_time(
            now.year() as u16,
            now.month() as u8,
            now.day() as u8,
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
        )
        .unwrap_or_default(),
    )
}

fn relative_slash(file: &ValidatedPath) -> String {
    file.relative()
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Byte stream over a finished archive. Dropping the stream deletes the
/// temporary file, whether or not it was read to the end.
pub struct ArchiveStream {
    inner: ReaderStream<tokio::fs::File>,
    _temp: TempPath,
}

impl ArchiveStream {
    pub fn new(archive: BuiltArchive) -> io::Result<Self> {
        let (mut file, temp) = archive.file.into_parts();
        file.rewind()?;
        Ok(Self { inner: ReaderStream::new(tokio::fs::File::from_std(file)), _temp: temp })
    }
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
