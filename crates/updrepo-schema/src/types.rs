//! Identifiers and value types exchanged between the resolver and the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Opaque handle a resolver hands out when a source is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(u32);

impl SourceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a repository was introduced: shipped with the system or supplied by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Default,
    User,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Default => "default",
            Origin::User => "user",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Origin::Default),
            "user" => Ok(Origin::User),
            other => Err(format!("unknown origin '{other}', expected 'default' or 'user'")),
        }
    }
}

/// Repository format reported by a probe.
///
/// `Unknown` means the location answered but its format is not usable.
/// A probe that gets no answer at all is modelled as `None` by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepoType {
    RpmMd,
    Yast2,
    PlainDir,
    Index,
    Unknown,
}

impl RepoType {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoType::RpmMd => "RPMMD",
            RepoType::Yast2 => "YaST",
            RepoType::PlainDir => "Plaindir",
            RepoType::Index => "Index",
            RepoType::Unknown => "NONE",
        }
    }

    #[inline]
    pub fn is_usable(self) -> bool {
        self != RepoType::Unknown
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoType {
    type Err = std::convert::Infallible;

    /// Unrecognized names map to `Unknown` rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "rpmmd" | "rpm-md" => RepoType::RpmMd,
            "yast" | "yast2" | "susetags" => RepoType::Yast2,
            "plaindir" => RepoType::PlainDir,
            "index" => RepoType::Index,
            _ => RepoType::Unknown,
        })
    }
}

/// Kind of resolvable to list from the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvableKind {
    Package,
    Product,
}

/// A package as reported by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,
    /// Location of the package payload relative to the repository root.
    pub path: String,
    pub source: SourceId,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, source: SourceId) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            source,
        }
    }

    /// File extension of the payload (`rpm`, `tar`, ...), if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.path).extension().and_then(|e| e.to_str())
    }
}
