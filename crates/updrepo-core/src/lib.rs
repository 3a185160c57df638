//! Update repository pipeline for the installer's runtime system.
//!
//! An [`UpdateRepository`] registers an external package source with the
//! resolver, lists the packages that source contributes, turns each one into a
//! read-only squashfs image (download, extract, compress) and later mounts the
//! images and splices them into the live root. Fetching is transactional per
//! call: when any package fails, every image produced by that call is deleted
//! before the error is returned.

pub mod apply;
pub mod catalog;
pub mod concurrency;
pub mod materializer;
pub mod repository;
pub mod session;

pub use apply::{ApplyEngine, MountRecord};
pub use catalog::PackageCatalog;
pub use concurrency::{install_signal_handler, shutdown_requested, UpdatesLock};
pub use materializer::PackageMaterializer;
pub use repository::{Collaborators, UpdateRepository};
pub use session::RepositorySession;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("not a valid update repository: {repo} ({reason})")]
    NotValidRepo { repo: String, reason: String },
    #[error("could not probe update repository {repo}: {reason}")]
    CouldNotProbeRepo { repo: String, reason: String },
    #[error("could not refresh update repository {repo}: {reason}")]
    CouldNotRefreshRepo { repo: String, reason: String },
    #[error("could not fetch update from {repo}: {reason}")]
    CouldNotFetchUpdate { repo: String, reason: String },
    #[error("could not mount update '{image}': {reason}")]
    CouldNotMountUpdate { image: PathBuf, reason: String },
    #[error("update mounted at '{mount_point}' could not be applied: {reason}")]
    CouldNotBeApplied { mount_point: PathBuf, reason: String },
    #[error("resolver error: {0}")]
    Resolver(#[from] updrepo_remote::RemoteError),
    #[error("store error: {0}")]
    Store(#[from] updrepo_store::StoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Whether the error comes from talking to the repository (probe, refresh, fetch)
    /// rather than from applying images to the running system.
    pub fn is_repository_error(&self) -> bool {
        matches!(
            self,
            Self::NotValidRepo { .. }
                | Self::CouldNotProbeRepo { .. }
                | Self::CouldNotRefreshRepo { .. }
                | Self::CouldNotFetchUpdate { .. }
        )
    }

    pub fn is_apply_error(&self) -> bool {
        matches!(
            self,
            Self::CouldNotMountUpdate { .. } | Self::CouldNotBeApplied { .. }
        )
    }
}
