use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest the installer's runtime system reads to splice mounted trees into `/`.
pub const DEFAULT_PARTS_FILE: &str = "/etc/instsys.parts";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("config value '{key}' must not be empty")]
    EmptyValue { key: &'static str },
}

/// Pipeline configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepositorySection {
    /// Secondary path passed to the resolver together with the base URL.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            probe_path: default_probe_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathsSection {
    #[serde(default = "default_parts_file")]
    pub parts_file: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            parts_file: default_parts_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    #[serde(default = "default_mksquashfs")]
    pub mksquashfs: PathBuf,
    #[serde(default = "default_mount")]
    pub mount: PathBuf,
    #[serde(default = "default_adddir")]
    pub adddir: PathBuf,
    #[serde(default = "default_bsdtar")]
    pub bsdtar: PathBuf,
    /// Compressor passed to mksquashfs as `-comp`. An empty string keeps the tool default.
    #[serde(default = "default_compression")]
    pub compression: Option<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            mksquashfs: default_mksquashfs(),
            mount: default_mount(),
            adddir: default_adddir(),
            bsdtar: default_bsdtar(),
            compression: default_compression(),
        }
    }
}

fn default_probe_path() -> String {
    "/".to_owned()
}

fn default_parts_file() -> PathBuf {
    PathBuf::from(DEFAULT_PARTS_FILE)
}

fn default_mksquashfs() -> PathBuf {
    PathBuf::from("mksquashfs")
}

fn default_mount() -> PathBuf {
    PathBuf::from("mount")
}

fn default_adddir() -> PathBuf {
    PathBuf::from("/sbin/adddir")
}

fn default_bsdtar() -> PathBuf {
    PathBuf::from("bsdtar")
}

#[allow(clippy::unnecessary_wraps)]
fn default_compression() -> Option<String> {
    Some("xz".to_owned())
}

impl ToolsSection {
    /// The configured compressor, if one should be passed explicitly.
    pub fn compression(&self) -> Option<&str> {
        self.compression
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl UpdateConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.probe_path.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                key: "repository.probe_path",
            });
        }
        if self.paths.parts_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyValue {
                key: "paths.parts_file",
            });
        }
        for (key, tool) in [
            ("tools.mksquashfs", &self.tools.mksquashfs),
            ("tools.mount", &self.tools.mount),
            ("tools.adddir", &self.tools.adddir),
            ("tools.bsdtar", &self.tools.bsdtar),
        ] {
            if tool.as_os_str().is_empty() {
                return Err(ConfigError::EmptyValue { key });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = UpdateConfig::from_toml_str("").unwrap();
        assert_eq!(config, UpdateConfig::default());
        assert_eq!(config.repository.probe_path, "/");
        assert_eq!(config.paths.parts_file, PathBuf::from(DEFAULT_PARTS_FILE));
        assert_eq!(config.tools.adddir, PathBuf::from("/sbin/adddir"));
        assert_eq!(config.tools.compression.as_deref(), Some("xz"));
    }

    #[test]
    fn partial_config_overrides_only_given_keys() {
        let config = UpdateConfig::from_toml_str(
            r#"
[paths]
parts_file = "/tmp/parts"

[tools]
mksquashfs = "/usr/bin/mksquashfs"
"#,
        )
        .unwrap();
        assert_eq!(config.paths.parts_file, PathBuf::from("/tmp/parts"));
        assert_eq!(config.tools.mksquashfs, PathBuf::from("/usr/bin/mksquashfs"));
        assert_eq!(config.tools.mount, PathBuf::from("mount"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = UpdateConfig::from_toml_str("[tools]\nsquasher = \"x\"\n");
        assert!(matches!(result, Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn empty_probe_path_is_rejected() {
        let result = UpdateConfig::from_toml_str("[repository]\nprobe_path = \"  \"\n");
        assert!(matches!(
            result,
            Err(ConfigError::EmptyValue {
                key: "repository.probe_path"
            })
        ));
    }

    #[test]
    fn empty_compression_keeps_tool_default() {
        let config = UpdateConfig::from_toml_str("[tools]\ncompression = \"\"\n").unwrap();
        assert_eq!(config.tools.compression(), None);
        assert_eq!(UpdateConfig::default().tools.compression(), Some("xz"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updrepo.toml");
        fs::write(&path, "[repository]\nprobe_path = \"/updates\"\n").unwrap();
        let config = UpdateConfig::load(&path).unwrap();
        assert_eq!(config.repository.probe_path, "/updates");
    }

    #[test]
    fn load_missing_file_fails_with_io() {
        let dir = tempfile::tempdir().unwrap();
        let result = UpdateConfig::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
