use crate::StoreError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// One line of the parts manifest: an image and the directory it is mounted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartsEntry {
    pub image: PathBuf,
    pub mount_point: PathBuf,
}

/// Append-only manifest telling the running system which mounted trees to
/// splice into `/`. Later lines may overlay earlier ones, so existing content
/// is never rewritten or reordered.
#[derive(Debug, Clone)]
pub struct PartsManifest {
    path: PathBuf,
}

impl PartsManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `<image relative to /> <mount point>` as a single write.
    pub fn append(&self, image: &Path, mount_point: &Path) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = format!(
            "{} {}\n",
            relative_to_root(image).display(),
            mount_point.display()
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        debug!("appended to {}: {}", self.path.display(), line.trim_end());
        Ok(())
    }

    /// Parse the manifest. A missing file has no entries.
    pub fn entries(&self) -> Result<Vec<PartsEntry>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((image, mount_point)) = line.split_once(char::is_whitespace) else {
                return Err(StoreError::MalformedParts {
                    line: idx + 1,
                    content: line.to_owned(),
                });
            };
            entries.push(PartsEntry {
                image: PathBuf::from(image),
                mount_point: PathBuf::from(mount_point.trim()),
            });
        }
        Ok(entries)
    }
}

/// Strip the root component so `/download/update_000` becomes `download/update_000`.
pub fn relative_to_root(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect()
}
