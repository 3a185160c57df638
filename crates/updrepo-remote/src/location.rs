use crate::http::HttpClient;
use crate::{is_remote_scheme, RemoteError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use updrepo_schema::RepoUri;

/// Where a source's files live: behind a URL, or on a mounted local medium.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote { base: String },
    Local { root: PathBuf },
}

/// Join URL segments with exactly one `/` between them, dropping `./` prefixes.
fn join_url(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches("./").trim_start_matches('/');
    if rel.is_empty() {
        return base.trim_end_matches('/').to_owned();
    }
    format!("{}/{rel}", base.trim_end_matches('/'))
}

fn join_path(root: &Path, rel: &str) -> PathBuf {
    let rel = rel.trim_start_matches("./").trim_start_matches('/');
    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

impl SourceLocation {
    /// Resolve `url` plus the secondary `path` into a location.
    ///
    /// Local media (`dir`, `file`, `cd`, ...) are addressed by the URI's path
    /// component, which must already be reachable on the filesystem.
    pub fn resolve(url: &str, path: &str) -> Result<Self, RemoteError> {
        let uri = RepoUri::parse(url).map_err(|e| RemoteError::InvalidSource(e.to_string()))?;
        if is_remote_scheme(uri.scheme()) {
            if uri.query().is_some() {
                return Err(RemoteError::InvalidSource(format!(
                    "query strings are not supported for remote sources: {uri}"
                )));
            }
            Ok(Self::Remote {
                base: join_url(uri.as_str(), path),
            })
        } else {
            let local = uri.path();
            if local.is_empty() {
                return Err(RemoteError::InvalidSource(format!(
                    "local source has no path: {uri}"
                )));
            }
            Ok(Self::Local {
                root: join_path(Path::new(local), path),
            })
        }
    }

    /// Human-readable form with credentials removed.
    pub fn display_name(&self) -> String {
        match self {
            Self::Remote { base } => {
                RepoUri::parse(base).map_or_else(|_| base.clone(), |u| u.redacted())
            }
            Self::Local { root } => root.display().to_string(),
        }
    }

    /// Read a file below the location. `Ok(None)` if it does not exist.
    pub fn read(&self, http: &HttpClient, rel: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        match self {
            Self::Remote { base } => http.get_bytes(&join_url(base, rel)),
            Self::Local { root } => match fs::read(join_path(root, rel)) {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Copy a file below the location to `dest`.
    pub fn download_to(&self, http: &HttpClient, rel: &str, dest: &Path) -> Result<(), RemoteError> {
        match self {
            Self::Remote { base } => {
                http.download_to(&join_url(base, rel), dest)?;
            }
            Self::Local { root } => {
                let src = join_path(root, rel);
                if !src.is_file() {
                    return Err(RemoteError::NotFound(src.display().to_string()));
                }
                fs::copy(&src, dest)?;
            }
        }
        Ok(())
    }

    /// Whether a local location exists at all. Remote locations are only
    /// known to exist once a request gets an HTTP answer.
    pub fn local_root_exists(&self) -> Option<bool> {
        match self {
            Self::Remote { .. } => None,
            Self::Local { root } => Some(root.is_dir()),
        }
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote { .. } => f
                .debug_struct("Remote")
                .field("base", &self.display_name())
                .finish(),
            Self::Local { root } => f.debug_struct("Local").field("root", root).finish(),
        }
    }
}
