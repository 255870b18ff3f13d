//! Local blob store for attachment bytes.
//!
//! Uploaded files live under `<data_dir>/uploads/` and are referenced by a
//! root-relative path with a leading slash (`/uploads/<generated name>`).
//! The same reference is stored in attachment metadata and resolved back
//! through [`BlobStore::resolve`] for reads and deletes, so both sides of
//! the lifecycle always agree on the root.

use chrono::Utc;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::shared::error::ApiError;

pub const UPLOADS_PREFIX: &str = "uploads";

/// Length of the random token mixed into generated names. Combined with the
/// millisecond timestamp this makes collisions between concurrent uploads of
/// identically-named files practically impossible.
const NAME_TOKEN_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct BlobStore {
    data_dir: PathBuf,
}

/// A durably written blob, addressable by `path` from now on.
#[derive(Debug, Clone)]
pub struct SavedBlob {
    pub path: String,
    pub size: usize,
}

/// Outcome of a best-effort blob deletion. Callers log `Missing` and
/// `Failed` so orphaned blobs stay diagnosable; neither aborts the
/// surrounding metadata deletion.
#[derive(Debug)]
pub enum BlobDeletion {
    Removed,
    Missing,
    Failed(io::Error),
}

impl BlobStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Creates the uploads directory if absent. Safe to call concurrently;
    /// an already-existing directory is not an error.
    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(self.uploads_dir())
    }

    fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_PREFIX)
    }

    /// Maps a stored reference (`/uploads/<name>`) to an absolute path.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.data_dir.join(reference.trim_start_matches('/'))
    }

    /// Writes `bytes` under a freshly generated unique name and returns the
    /// reference. Nothing may be registered in the database for a blob
    /// whose write failed.
    pub fn save(&self, original_filename: &str, bytes: &[u8]) -> Result<SavedBlob, ApiError> {
        self.ensure_root().map_err(|e| {
            ApiError::Storage(format!("Failed to create uploads directory: {}", e))
        })?;

        let name = unique_name(original_filename);
        let reference = format!("/{}/{}", UPLOADS_PREFIX, name);
        let target = self.resolve(&reference);

        fs::write(&target, bytes).map_err(|e| {
            ApiError::Storage(format!("Failed to write {}: {}", target.display(), e))
        })?;

        info!("Stored blob {} ({} bytes)", reference, bytes.len());
        Ok(SavedBlob {
            path: reference,
            size: bytes.len(),
        })
    }

    /// Reads a blob back in full. A record pointing at a file that is gone
    /// from disk is tolerated and reported as `FileMissing`, distinct from
    /// a metadata miss.
    pub fn read(&self, reference: &str) -> Result<Vec<u8>, ApiError> {
        let target = self.resolve(reference);
        match fs::read(&target) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "Blob {} missing on disk (resolved to {})",
                    reference,
                    target.display()
                );
                Err(ApiError::FileMissing(format!(
                    "File not found: {}",
                    reference
                )))
            }
            Err(e) => Err(ApiError::Storage(format!(
                "Failed to read {}: {}",
                target.display(),
                e
            ))),
        }
    }

    /// Best-effort unlink. Never fails the caller; the outcome says whether
    /// an orphaned blob may remain on disk.
    pub fn delete(&self, reference: &str) -> BlobDeletion {
        match fs::remove_file(self.resolve(reference)) {
            Ok(()) => BlobDeletion::Removed,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BlobDeletion::Missing,
            Err(e) => BlobDeletion::Failed(e),
        }
    }

    pub fn exists(&self, reference: &str) -> bool {
        self.resolve(reference).is_file()
    }
}

/// `<millis>-<token>-<sanitized original>`, e.g.
/// `1722540000000-x4j2kqp9a1bc-report.pdf`.
pub fn unique_name(original_filename: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NAME_TOKEN_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!(
        "{}-{}-{}",
        timestamp,
        token,
        sanitize_filename(original_filename)
    )
}

/// Keeps ASCII alphanumerics, dots and hyphens; everything else becomes an
/// underscore. The original client-supplied name is untrusted and never
/// used as a disk path on its own.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "storage.test.rs"]
mod tests;
