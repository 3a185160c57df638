//! Naming of image files and mount points.
//!
//! Names are `<prefix><zero-padded index>`. The next index is one past the
//! highest index already present in the directory, so names from earlier
//! sessions are never reused.

use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

pub const NAME_PREFIX: &str = "update_";
pub const IMAGE_INDEX_WIDTH: usize = 3;
pub const MOUNT_INDEX_WIDTH: usize = 4;
const LOCK_FILE: &str = ".updrepo.lock";

/// Next free `<dir>/<prefix>NNN` path. A missing `dir` is treated as empty.
pub fn next_indexed_path(dir: &Path, prefix: &str, width: usize) -> Result<PathBuf, StoreError> {
    let next = highest_index(dir, prefix)?.map_or(0, |n| n + 1);
    Ok(dir.join(format!("{prefix}{next:0width$}")))
}

/// Path for the next squashed image inside a download directory.
pub fn next_image_path(dir: &Path) -> Result<PathBuf, StoreError> {
    next_indexed_path(dir, NAME_PREFIX, IMAGE_INDEX_WIDTH)
}

/// Path for the next mount point inside an updates directory.
pub fn next_mount_point(updates_root: &Path) -> Result<PathBuf, StoreError> {
    next_indexed_path(updates_root, NAME_PREFIX, MOUNT_INDEX_WIDTH)
}

/// Advisory lock file guarding mount-point allocation under `updates_root`.
#[inline]
pub fn lock_file(updates_root: &Path) -> PathBuf {
    updates_root.join(LOCK_FILE)
}

fn highest_index(dir: &Path, prefix: &str) -> Result<Option<u64>, StoreError> {
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut highest = None;
    for entry in listing {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(digits) = name.strip_prefix(prefix) else {
            continue;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = digits.parse::<u64>() {
            highest = highest.max(Some(n));
        }
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_image_in_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            next_image_path(dir.path()).unwrap(),
            dir.path().join("update_000")
        );
        assert_eq!(
            next_mount_point(dir.path()).unwrap(),
            dir.path().join("update_0000")
        );
    }

    #[test]
    fn missing_dir_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(
            next_image_path(&missing).unwrap(),
            missing.join("update_000")
        );
    }

    #[test]
    fn continues_after_highest_existing_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("update_000"), "").unwrap();
        fs::write(dir.path().join("update_007"), "").unwrap();
        fs::write(dir.path().join("update_notanumber"), "").unwrap();
        fs::write(dir.path().join("other_999"), "").unwrap();
        assert_eq!(
            next_image_path(dir.path()).unwrap(),
            dir.path().join("update_008")
        );
    }

    #[test]
    fn existing_mount_dirs_are_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("update_0000")).unwrap();
        fs::create_dir(dir.path().join("update_0001")).unwrap();
        assert_eq!(
            next_mount_point(dir.path()).unwrap(),
            dir.path().join("update_0002")
        );
    }

    #[test]
    fn index_wider_than_padding_still_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("update_999"), "").unwrap();
        assert_eq!(
            next_image_path(dir.path()).unwrap(),
            dir.path().join("update_1000")
        );
    }
}
