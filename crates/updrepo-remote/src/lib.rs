//! Package resolver and download contracts for update sources.
//!
//! The pipeline talks to a package resolver only through the [`Resolver`]
//! and [`PackageDownloader`] traits, so the real service and test doubles are
//! interchangeable. This crate ships an [`IndexResolver`] for sources that
//! publish a JSON package index over HTTP(S) or on a local path, and a
//! [`mock::MockResolver`] that scripts every answer and records every call.

pub mod http;
pub mod index;
pub mod location;
pub mod mock;
pub mod resolver;

pub use http::HttpClient;
pub use index::{IndexEntry, PackageIndex, INDEX_FILE};
pub use location::SourceLocation;
pub use mock::{MockResolver, ResolverCall};
pub use resolver::IndexResolver;

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use updrepo_schema::{PackageDescriptor, RepoType, ResolvableKind, SourceId};

/// URL schemes served over the network. Everything else is a local medium.
const REMOTE_SCHEMES: &[&str] = &[
    "http", "https", "ftp", "tftp", "smb", "cifs", "nfs", "nfs4", "sftp",
];

/// Classify a URL scheme as remote (network) or local (device, directory).
pub fn is_remote_scheme(scheme: &str) -> bool {
    REMOTE_SCHEMES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(scheme))
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("unknown source id {0}")]
    UnknownSource(SourceId),
    #[error("source {0} has not been refreshed")]
    NotRefreshed(SourceId),
    #[error("package '{name}' not found in source {source_id}")]
    PackageNotFound { source_id: SourceId, name: String },
    #[error("resolver error: {0}")]
    Resolver(String),
}

/// Registration data for a new source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub alias: String,
    pub name: String,
    pub base_urls: Vec<String>,
    /// Secondary path appended to the base URL.
    pub prod_dir: String,
    pub enabled: bool,
}

/// The package resolver service.
pub trait Resolver: Send + Sync {
    /// Detect the repository format at `url` + `path`.
    ///
    /// `None` means the location gave no answer at all; `Some(RepoType::Unknown)`
    /// means it answered but the format is not usable.
    fn probe(&self, url: &str, path: &str) -> Option<RepoType>;

    /// Register a source and return its handle.
    fn add_source(&self, config: &SourceConfig) -> Result<SourceId, RemoteError>;

    /// Load (or reload) the source's package list.
    fn refresh(&self, source: SourceId) -> Result<(), RemoteError>;

    /// Every known resolvable of `kind`, across all registered sources.
    fn list_resolvables(&self, kind: ResolvableKind)
        -> Result<Vec<PackageDescriptor>, RemoteError>;

    fn delete_source(&self, source: SourceId) -> Result<(), RemoteError>;

    /// Drop cached data and handles held for all sources.
    fn release_all(&self) -> Result<(), RemoteError>;

    /// Persist the source state.
    fn save_all(&self) -> Result<(), RemoteError>;

    fn url_scheme_is_remote(&self, scheme: &str) -> bool {
        is_remote_scheme(scheme)
    }
}

/// Retrieves a package payload from a registered source.
pub trait PackageDownloader: Send + Sync {
    fn download(&self, source: SourceId, package: &str, dest: &Path) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_schemes_are_remote() {
        assert!(is_remote_scheme("http"));
        assert!(is_remote_scheme("HTTPS"));
        assert!(is_remote_scheme("nfs"));
    }

    #[test]
    fn device_schemes_are_local() {
        assert!(!is_remote_scheme("cd"));
        assert!(!is_remote_scheme("dvd"));
        assert!(!is_remote_scheme("dir"));
        assert!(!is_remote_scheme("file"));
        assert!(!is_remote_scheme("usb"));
    }

    #[test]
    fn package_not_found_display() {
        let e = RemoteError::PackageNotFound {
            source_id: SourceId::new(3),
            name: "pkg1".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pkg1"));
        assert!(msg.contains('3'));
    }
}
