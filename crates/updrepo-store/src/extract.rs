use crate::StoreError;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Unpacks a downloaded package payload into a directory.
pub trait PackageExtractor: Send + Sync {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), StoreError>;
}

/// In-process extraction of plain tar payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl TarExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PackageExtractor for TarExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), StoreError> {
        let failed = |reason: String| StoreError::ExtractionFailed {
            archive: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
        if file.metadata().map_err(|e| failed(e.to_string()))?.len() == 0 {
            return Err(failed("archive is empty".to_owned()));
        }
        fs::create_dir_all(dest_dir)?;

        let mut ar = tar::Archive::new(BufReader::new(file));
        ar.set_preserve_permissions(true);
        ar.set_preserve_mtime(false);
        ar.set_unpack_xattrs(false);
        ar.unpack(dest_dir).map_err(|e| failed(e.to_string()))?;
        Ok(())
    }
}
