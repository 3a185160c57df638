use crate::UpdateError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Exclusive advisory lock on an updates directory.
///
/// Held for a whole apply pass so two sessions never pick the same mount point.
pub struct UpdatesLock {
    file: File,
}

fn open_lock_file(lock_path: &Path) -> Result<File, UpdateError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

impl UpdatesLock {
    pub fn acquire(lock_path: &Path) -> Result<Self, UpdateError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive()
            .map_err(|e| UpdateError::Io(std::io::Error::new(std::io::ErrorKind::WouldBlock, e)))?;
        debug!("acquired {}", lock_path.display());
        Ok(Self { file })
    }

    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, UpdateError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file })),
            Err(_) => Ok(None),
        }
    }
}

impl Drop for UpdatesLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Install a Ctrl-C handler that asks running fetches to stop after the
/// current package. A second Ctrl-C exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\ninterrupt received, stopping after the current package...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
