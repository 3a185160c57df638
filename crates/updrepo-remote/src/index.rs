use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Index file published at the root of an update source.
pub const INDEX_FILE: &str = "packages.json";

/// One package listed in a source index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    /// Payload location relative to the source root.
    pub path: String,
}

/// The package index: `{"packages": [{"name": ..., "path": ...}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageIndex {
    #[serde(default)]
    pub packages: Vec<IndexEntry>,
}

impl PackageIndex {
    pub fn from_bytes(data: &[u8]) -> Result<Self, RemoteError> {
        let index: Self = serde_json::from_slice(data)
            .map_err(|e| RemoteError::Serialization(format!("invalid package index: {e}")))?;
        if let Some(bad) = index
            .packages
            .iter()
            .find(|p| p.name.trim().is_empty() || p.path.trim().is_empty())
        {
            return Err(RemoteError::Serialization(format!(
                "package index entry has empty name or path: {bad:?}"
            )));
        }
        if let Some(bad) = index.packages.iter().find(|p| {
            Path::new(&p.path)
                .components()
                .any(|c| c == Component::ParentDir)
        }) {
            return Err(RemoteError::Serialization(format!(
                "package '{}' points outside the source root: {}",
                bad.name, bad.path
            )));
        }
        Ok(index)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RemoteError> {
        serde_json::to_vec_pretty(self).map_err(|e| RemoteError::Serialization(e.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&IndexEntry> {
        self.packages.iter().find(|p| p.name == name)
    }
}
