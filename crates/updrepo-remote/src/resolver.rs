use crate::http::HttpClient;
use crate::index::{PackageIndex, INDEX_FILE};
use crate::location::SourceLocation;
use crate::{PackageDownloader, RemoteError, Resolver, SourceConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use updrepo_schema::{PackageDescriptor, RepoType, RepoUri, ResolvableKind, SourceId};

const STATE_FILE: &str = "sources.json";

struct RegisteredSource {
    config: SourceConfig,
    location: SourceLocation,
    index: Option<PackageIndex>,
}

struct ResolverState {
    next_id: u32,
    sources: BTreeMap<SourceId, RegisteredSource>,
}

/// Persisted view of a registered source. URLs are stored redacted.
#[derive(Serialize)]
struct SavedSource<'a> {
    id: SourceId,
    alias: &'a str,
    name: &'a str,
    base_urls: Vec<String>,
    prod_dir: &'a str,
    enabled: bool,
    packages: Option<usize>,
}

/// Resolver for sources that publish a `packages.json` index at their root.
///
/// Remote schemes are fetched over HTTP; local schemes are read from the
/// filesystem. Source ids are handed out in increasing order starting at 1.
pub struct IndexResolver {
    http: HttpClient,
    state_dir: Option<PathBuf>,
    state: Mutex<ResolverState>,
}

impl Default for IndexResolver {
    fn default() -> Self {
        Self {
            http: HttpClient::new(),
            state_dir: None,
            state: Mutex::new(ResolverState {
                next_id: 1,
                sources: BTreeMap::new(),
            }),
        }
    }
}

impl IndexResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist source state into `dir` on [`Resolver::save_all`].
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, ResolverState>, RemoteError> {
        self.state
            .lock()
            .map_err(|e| RemoteError::Resolver(format!("mutex poisoned: {e}")))
    }

    fn location_of(&self, source: SourceId) -> Result<SourceLocation, RemoteError> {
        let state = self.lock()?;
        state
            .sources
            .get(&source)
            .map(|s| s.location.clone())
            .ok_or(RemoteError::UnknownSource(source))
    }

    fn write_state(dir: &Path, saved: &[SavedSource<'_>]) -> Result<(), RemoteError> {
        fs::create_dir_all(dir)?;
        let content = serde_json::to_vec_pretty(saved)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let tmp = dir.join(format!("{STATE_FILE}.tmp"));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&content)?;
        file.sync_all()?;
        fs::rename(&tmp, dir.join(STATE_FILE))?;
        Ok(())
    }
}

impl Resolver for IndexResolver {
    fn probe(&self, url: &str, path: &str) -> Option<RepoType> {
        let location = match SourceLocation::resolve(url, path) {
            Ok(loc) => loc,
            Err(e) => {
                warn!("cannot probe source: {e}");
                return None;
            }
        };
        if location.local_root_exists() == Some(false) {
            debug!("probe: {} does not exist", location.display_name());
            return None;
        }
        match location.read(&self.http, INDEX_FILE) {
            Ok(Some(data)) => match PackageIndex::from_bytes(&data) {
                Ok(_) => Some(RepoType::Index),
                Err(e) => {
                    debug!("probe: {} has an unusable index: {e}", location.display_name());
                    Some(RepoType::Unknown)
                }
            },
            Ok(None) => Some(RepoType::Unknown),
            Err(e) => {
                debug!("probe: {} unreachable: {e}", location.display_name());
                None
            }
        }
    }

    fn add_source(&self, config: &SourceConfig) -> Result<SourceId, RemoteError> {
        let url = config
            .base_urls
            .first()
            .ok_or_else(|| RemoteError::InvalidSource("no base URL given".to_owned()))?;
        let location = SourceLocation::resolve(url, &config.prod_dir)?;

        let mut state = self.lock()?;
        let id = SourceId::new(state.next_id);
        state.next_id += 1;
        info!("registered source {id}: {}", location.display_name());
        state.sources.insert(
            id,
            RegisteredSource {
                config: config.clone(),
                location,
                index: None,
            },
        );
        Ok(id)
    }

    fn refresh(&self, source: SourceId) -> Result<(), RemoteError> {
        let location = self.location_of(source)?;
        let data = location
            .read(&self.http, INDEX_FILE)?
            .ok_or_else(|| RemoteError::NotFound(format!("{}/{INDEX_FILE}", location.display_name())))?;
        let index = PackageIndex::from_bytes(&data)?;
        debug!("source {source}: {} package(s) in index", index.packages.len());

        let mut state = self.lock()?;
        let entry = state
            .sources
            .get_mut(&source)
            .ok_or(RemoteError::UnknownSource(source))?;
        entry.index = Some(index);
        Ok(())
    }

    fn list_resolvables(
        &self,
        kind: ResolvableKind,
    ) -> Result<Vec<PackageDescriptor>, RemoteError> {
        if kind != ResolvableKind::Package {
            return Ok(Vec::new());
        }
        let state = self.lock()?;
        Ok(state
            .sources
            .iter()
            .filter(|(_, s)| s.config.enabled)
            .filter_map(|(id, s)| s.index.as_ref().map(|index| (*id, index)))
            .flat_map(|(id, index)| {
                index
                    .packages
                    .iter()
                    .map(move |p| PackageDescriptor::new(p.name.clone(), p.path.clone(), id))
            })
            .collect())
    }

    fn delete_source(&self, source: SourceId) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        match state.sources.remove(&source) {
            Some(_) => {
                debug!("deleted source {source}");
                Ok(())
            }
            None => Err(RemoteError::UnknownSource(source)),
        }
    }

    fn release_all(&self) -> Result<(), RemoteError> {
        let mut state = self.lock()?;
        for source in state.sources.values_mut() {
            source.index = None;
        }
        Ok(())
    }

    fn save_all(&self) -> Result<(), RemoteError> {
        let Some(dir) = &self.state_dir else {
            return Ok(());
        };
        let state = self.lock()?;
        let saved: Vec<SavedSource<'_>> = state
            .sources
            .iter()
            .map(|(id, s)| SavedSource {
                id: *id,
                alias: &s.config.alias,
                name: &s.config.name,
                base_urls: s
                    .config
                    .base_urls
                    .iter()
                    .map(|u| RepoUri::parse(u).map_or_else(|_| u.clone(), |u| u.redacted()))
                    .collect(),
                prod_dir: &s.config.prod_dir,
                enabled: s.config.enabled,
                packages: s.index.as_ref().map(|i| i.packages.len()),
            })
            .collect();
        Self::write_state(dir, &saved)?;
        debug!("saved {} source(s) to {}", saved.len(), dir.display());
        Ok(())
    }
}

impl PackageDownloader for IndexResolver {
    fn download(&self, source: SourceId, package: &str, dest: &Path) -> Result<(), RemoteError> {
        let (location, rel) = {
            let state = self.lock()?;
            let entry = state
                .sources
                .get(&source)
                .ok_or(RemoteError::UnknownSource(source))?;
            let index = entry
                .index
                .as_ref()
                .ok_or(RemoteError::NotRefreshed(source))?;
            let pkg = index
                .find(package)
                .ok_or_else(|| RemoteError::PackageNotFound {
                    source_id: source,
                    name: package.to_owned(),
                })?;
            (entry.location.clone(), pkg.path.clone())
        };
        debug!("downloading {package} from source {source}");
        location.download_to(&self.http, &rel, dest)
    }
}
