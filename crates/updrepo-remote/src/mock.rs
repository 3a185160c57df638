use crate::{PackageDownloader, RemoteError, Resolver, SourceConfig};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use updrepo_schema::{PackageDescriptor, RepoType, ResolvableKind, SourceId};

/// A call received by [`MockResolver`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverCall {
    Probe { url: String, path: String },
    AddSource(SourceConfig),
    Refresh(SourceId),
    ListResolvables(ResolvableKind),
    DeleteSource(SourceId),
    ReleaseAll,
    SaveAll,
    Download { source: SourceId, package: String, dest: PathBuf },
}

#[derive(Debug)]
struct Script {
    probe: Option<RepoType>,
    next_id: u32,
    refresh_ok: bool,
    add_ok: bool,
    delete_ok: bool,
    release_ok: bool,
    save_ok: bool,
    resolvables: Vec<PackageDescriptor>,
    failing_downloads: HashSet<String>,
    payloads: HashMap<String, Vec<u8>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            probe: Some(RepoType::RpmMd),
            next_id: 1,
            refresh_ok: true,
            add_ok: true,
            delete_ok: true,
            release_ok: true,
            save_ok: true,
            resolvables: Vec::new(),
            failing_downloads: HashSet::new(),
            payloads: HashMap::new(),
        }
    }
}

/// Scripted resolver for tests.
///
/// Answers probes with `RpmMd` and registers sources starting at id 1 unless
/// told otherwise. Downloads write `mock-package:<name>` unless a payload was
/// set for the package.
#[derive(Debug, Default)]
pub struct MockResolver {
    script: Mutex<Script>,
    calls: Mutex<Vec<ResolverCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn scripted_failure(op: &str) -> RemoteError {
    RemoteError::Resolver(format!("mock: {op} failed"))
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_probe_result(&self, result: Option<RepoType>) {
        lock(&self.script).probe = result;
    }

    /// Id handed out by the next `add_source`.
    pub fn set_next_source_id(&self, id: u32) {
        lock(&self.script).next_id = id;
    }

    pub fn set_add_source_ok(&self, ok: bool) {
        lock(&self.script).add_ok = ok;
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        lock(&self.script).refresh_ok = ok;
    }

    pub fn set_delete_ok(&self, ok: bool) {
        lock(&self.script).delete_ok = ok;
    }

    pub fn set_release_ok(&self, ok: bool) {
        lock(&self.script).release_ok = ok;
    }

    pub fn set_save_ok(&self, ok: bool) {
        lock(&self.script).save_ok = ok;
    }

    pub fn set_resolvables(&self, resolvables: Vec<PackageDescriptor>) {
        lock(&self.script).resolvables = resolvables;
    }

    pub fn fail_download(&self, package: &str) {
        lock(&self.script)
            .failing_downloads
            .insert(package.to_owned());
    }

    pub fn set_payload(&self, package: &str, payload: impl Into<Vec<u8>>) {
        lock(&self.script)
            .payloads
            .insert(package.to_owned(), payload.into());
    }

    pub fn calls(&self) -> Vec<ResolverCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, pred: impl Fn(&ResolverCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: ResolverCall) {
        lock(&self.calls).push(call);
    }
}

impl Resolver for MockResolver {
    fn probe(&self, url: &str, path: &str) -> Option<RepoType> {
        self.record(ResolverCall::Probe {
            url: url.to_owned(),
            path: path.to_owned(),
        });
        lock(&self.script).probe
    }

    fn add_source(&self, config: &SourceConfig) -> Result<SourceId, RemoteError> {
        self.record(ResolverCall::AddSource(config.clone()));
        let mut script = lock(&self.script);
        if !script.add_ok {
            return Err(scripted_failure("add_source"));
        }
        let id = SourceId::new(script.next_id);
        script.next_id += 1;
        Ok(id)
    }

    fn refresh(&self, source: SourceId) -> Result<(), RemoteError> {
        self.record(ResolverCall::Refresh(source));
        if lock(&self.script).refresh_ok {
            Ok(())
        } else {
            Err(scripted_failure("refresh"))
        }
    }

    fn list_resolvables(
        &self,
        kind: ResolvableKind,
    ) -> Result<Vec<PackageDescriptor>, RemoteError> {
        self.record(ResolverCall::ListResolvables(kind));
        match kind {
            ResolvableKind::Package => Ok(lock(&self.script).resolvables.clone()),
            ResolvableKind::Product => Ok(Vec::new()),
        }
    }

    fn delete_source(&self, source: SourceId) -> Result<(), RemoteError> {
        self.record(ResolverCall::DeleteSource(source));
        if lock(&self.script).delete_ok {
            Ok(())
        } else {
            Err(scripted_failure("delete_source"))
        }
    }

    fn release_all(&self) -> Result<(), RemoteError> {
        self.record(ResolverCall::ReleaseAll);
        if lock(&self.script).release_ok {
            Ok(())
        } else {
            Err(scripted_failure("release_all"))
        }
    }

    fn save_all(&self) -> Result<(), RemoteError> {
        self.record(ResolverCall::SaveAll);
        if lock(&self.script).save_ok {
            Ok(())
        } else {
            Err(scripted_failure("save_all"))
        }
    }
}

impl PackageDownloader for MockResolver {
    fn download(&self, source: SourceId, package: &str, dest: &Path) -> Result<(), RemoteError> {
        self.record(ResolverCall::Download {
            source,
            package: package.to_owned(),
            dest: dest.to_path_buf(),
        });
        let payload = {
            let script = lock(&self.script);
            if script.failing_downloads.contains(package) {
                return Err(RemoteError::NotFound(format!("mock: {package}")));
            }
            script
                .payloads
                .get(package)
                .cloned()
                .unwrap_or_else(|| format!("mock-package:{package}").into_bytes())
        };
        std::fs::write(dest, payload)?;
        Ok(())
    }
}
