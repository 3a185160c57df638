//! Shared value types and configuration for updrepo.
//!
//! This crate defines the schema layer: resolver handles (`SourceId`), package
//! descriptors as reported by a resolver (`PackageDescriptor`), repository
//! origins and probed types, URI parsing with credential redaction (`RepoUri`),
//! and the TOML configuration (`UpdateConfig`) consumed by the pipeline.

pub mod config;
pub mod types;
pub mod uri;

pub use config::{
    ConfigError, PathsSection, RepositorySection, ToolsSection, UpdateConfig, DEFAULT_PARTS_FILE,
};
pub use types::{Origin, PackageDescriptor, RepoType, ResolvableKind, SourceId};
pub use uri::{RepoUri, UriError};
