//! On-disk state for update images.
//!
//! This crate provides the storage layer of the update pipeline: collision-free
//! naming of image files and mount points (`layout`), the session's list of
//! produced images with transactional batches (`ImageRegistry`, `FetchBatch`),
//! the append-only parts manifest that splices mounts into the live root
//! (`PartsManifest`), and in-process extraction of package payloads
//! (`PackageExtractor`, `TarExtractor`).

pub mod extract;
pub mod layout;
pub mod parts;
pub mod registry;

pub use extract::{PackageExtractor, TarExtractor};
pub use layout::{
    lock_file, next_image_path, next_indexed_path, next_mount_point, IMAGE_INDEX_WIDTH,
    MOUNT_INDEX_WIDTH, NAME_PREFIX,
};
pub use parts::{relative_to_root, PartsEntry, PartsManifest};
pub use registry::{FetchBatch, ImageRegistry};

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` if a file was actually deleted.
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to remove '{path}': {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to extract '{archive}': {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },
    #[error("malformed parts manifest line {line}: '{content}'")]
    MalformedParts { line: usize, content: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_if_exists_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone");
        assert!(!remove_if_exists(&path).unwrap());
        std::fs::write(&path, "x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn store_error_display_extraction_failed() {
        let e = StoreError::ExtractionFailed {
            archive: PathBuf::from("/tmp/pkg.tar"),
            reason: "truncated".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/pkg.tar"));
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn store_error_display_malformed_parts() {
        let e = StoreError::MalformedParts {
            line: 3,
            content: "garbage".to_owned(),
        };
        assert!(e.to_string().contains("line 3"));
    }
}
