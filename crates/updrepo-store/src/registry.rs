use crate::{remove_if_exists, StoreError};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Image files produced for one update session, in the order they were added.
///
/// The list is mutex-guarded so a rollback running from an error path can
/// inspect and clear it while a batch is still alive.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    files: Mutex<Vec<PathBuf>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the tracked files.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().iter().any(|p| p == path)
    }

    /// Start a batch whose images only become visible here on commit.
    pub fn begin_batch(&self) -> FetchBatch<'_> {
        FetchBatch {
            registry: self,
            staged: Vec::new(),
            finished: false,
        }
    }

    /// Delete every tracked file and clear the list.
    ///
    /// Missing files are not an error, so calling this twice is safe. Files
    /// that could not be deleted stay tracked and the first failure is returned.
    pub fn remove_all(&self) -> Result<usize, StoreError> {
        let mut files = self.lock();
        let (removed, failure) = remove_files(&mut files);
        debug!("removed {removed} update image(s)");
        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}

/// Delete `files` from disk, keeping only the entries whose removal failed.
fn remove_files(files: &mut Vec<PathBuf>) -> (usize, Option<StoreError>) {
    let mut removed = 0;
    let mut failure = None;
    files.retain(|path| match remove_if_exists(path) {
        Ok(deleted) => {
            if deleted {
                removed += 1;
            }
            false
        }
        Err(source) => {
            warn!("failed to remove {}: {source}", path.display());
            if failure.is_none() {
                failure = Some(StoreError::RemoveFailed {
                    path: path.clone(),
                    source,
                });
            }
            true
        }
    });
    (removed, failure)
}

/// Images materialized by one `fetch` call.
///
/// Staged images are appended to the registry only by [`commit`](Self::commit).
/// [`abort`](Self::abort), or dropping the batch without committing, deletes
/// every staged file, so a failed batch leaves nothing behind.
#[derive(Debug)]
pub struct FetchBatch<'a> {
    registry: &'a ImageRegistry,
    staged: Vec<PathBuf>,
    finished: bool,
}

impl FetchBatch<'_> {
    pub fn stage(&mut self, image: PathBuf) {
        self.staged.push(image);
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Append all staged images to the registry and return them.
    pub fn commit(mut self) -> Vec<PathBuf> {
        self.finished = true;
        let staged = std::mem::take(&mut self.staged);
        self.registry.lock().extend(staged.iter().cloned());
        debug!("committed {} update image(s)", staged.len());
        staged
    }

    /// Delete all staged images. Returns how many files were removed.
    pub fn abort(mut self) -> Result<usize, StoreError> {
        self.finished = true;
        self.discard()
    }

    fn discard(&mut self) -> Result<usize, StoreError> {
        let (removed, failure) = remove_files(&mut self.staged);
        if removed > 0 {
            debug!("rolled back {removed} staged update image(s)");
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }
}

impl Drop for FetchBatch<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.discard() {
                warn!("rollback of uncommitted batch incomplete: {e}");
            }
        }
    }
}
