use crate::UpdateError;
use std::sync::Arc;
use tracing::{debug, info, warn};
use updrepo_remote::{Resolver, SourceConfig};
use updrepo_schema::{RepoUri, SourceId};

/// Alias under which update sources are registered with the resolver.
const SOURCE_ALIAS: &str = "update-repository";

/// One registration of an update source with the resolver.
///
/// The source id is set by a successful [`add`](Self::add) and cleared by
/// [`release`](Self::release). A failed refresh removes the registration again,
/// so the session never holds an id the catalog cannot use.
pub struct RepositorySession {
    uri: RepoUri,
    probe_path: String,
    resolver: Arc<dyn Resolver>,
    source_id: Option<SourceId>,
}

impl RepositorySession {
    pub fn new(uri: RepoUri, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            uri,
            probe_path: "/".to_owned(),
            resolver,
            source_id: None,
        }
    }

    pub fn set_probe_path(&mut self, probe_path: impl Into<String>) {
        self.probe_path = probe_path.into();
    }

    pub fn uri(&self) -> &RepoUri {
        &self.uri
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.resolver.as_ref()
    }

    pub fn source_id(&self) -> Option<SourceId> {
        self.source_id
    }

    /// Probe, register and refresh the source. A second call returns the
    /// cached id without touching the resolver.
    pub fn add(&mut self) -> Result<SourceId, UpdateError> {
        if let Some(id) = self.source_id {
            return Ok(id);
        }
        let repo = self.uri.redacted();

        info!("probing update repository {repo}");
        let repo_type = match self.resolver.probe(self.uri.as_str(), &self.probe_path) {
            None => {
                return Err(UpdateError::CouldNotProbeRepo {
                    repo,
                    reason: "the resolver got no answer from the location".to_owned(),
                })
            }
            Some(t) if !t.is_usable() => {
                return Err(UpdateError::NotValidRepo {
                    repo,
                    reason: format!("unsupported repository type {t}"),
                })
            }
            Some(t) => t,
        };
        debug!("{repo} is a {repo_type} repository");

        let config = SourceConfig {
            alias: SOURCE_ALIAS.to_owned(),
            name: repo.clone(),
            base_urls: vec![self.uri.as_str().to_owned()],
            prod_dir: self.probe_path.clone(),
            enabled: true,
        };
        let id = self
            .resolver
            .add_source(&config)
            .map_err(|e| UpdateError::CouldNotRefreshRepo {
                repo: repo.clone(),
                reason: format!("registration failed: {e}"),
            })?;

        if let Err(e) = self.resolver.refresh(id) {
            if let Err(del) = self.resolver.delete_source(id) {
                warn!("failed to remove source {id} after refresh error: {del}");
            }
            return Err(UpdateError::CouldNotRefreshRepo {
                repo,
                reason: e.to_string(),
            });
        }

        info!("added update repository {repo} as source {id}");
        self.source_id = Some(id);
        Ok(id)
    }

    /// Delete the registration, release resolver handles and persist its state.
    ///
    /// All three steps are attempted; the first failure is returned.
    pub fn release(&mut self) -> Result<(), UpdateError> {
        let mut errors = Vec::new();

        if let Some(id) = self.source_id.take() {
            debug!("deleting source {id}");
            if let Err(e) = self.resolver.delete_source(id) {
                warn!("failed to delete source {id}: {e}");
                errors.push(e);
            }
        }
        if let Err(e) = self.resolver.release_all() {
            warn!("failed to release resolver sources: {e}");
            errors.push(e);
        }
        if let Err(e) = self.resolver.save_all() {
            warn!("failed to save resolver state: {e}");
            errors.push(e);
        }

        match errors.into_iter().next() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use updrepo_remote::mock::{MockResolver, ResolverCall};
    use updrepo_schema::RepoType;

    fn session(mock: &Arc<MockResolver>) -> RepositorySession {
        let uri = RepoUri::parse("http://updates.opensuse.org/sles12").unwrap();
        RepositorySession::new(uri, Arc::clone(mock) as Arc<dyn Resolver>)
    }

    #[test]
    fn add_probes_registers_and_refreshes() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        assert_eq!(s.add().unwrap(), SourceId::new(1));

        let calls = mock.calls();
        assert_eq!(
            calls[0],
            ResolverCall::Probe {
                url: "http://updates.opensuse.org/sles12".to_owned(),
                path: "/".to_owned()
            }
        );
        match &calls[1] {
            ResolverCall::AddSource(cfg) => {
                assert_eq!(cfg.base_urls, vec!["http://updates.opensuse.org/sles12".to_owned()]);
                assert_eq!(cfg.prod_dir, "/");
            }
            other => panic!("expected AddSource, got {other:?}"),
        }
        assert_eq!(calls[2], ResolverCall::Refresh(SourceId::new(1)));
    }

    #[test]
    fn add_is_idempotent() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        let first = s.add().unwrap();
        let calls = mock.calls().len();
        assert_eq!(s.add().unwrap(), first);
        assert_eq!(mock.calls().len(), calls);
    }

    #[test]
    fn unknown_type_is_not_valid_repo() {
        let mock = Arc::new(MockResolver::new());
        mock.set_probe_result(Some(RepoType::Unknown));
        let err = session(&mock).add().unwrap_err();
        assert!(matches!(err, UpdateError::NotValidRepo { .. }));
    }

    #[test]
    fn missing_probe_answer_is_could_not_probe() {
        let mock = Arc::new(MockResolver::new());
        mock.set_probe_result(None);
        let err = session(&mock).add().unwrap_err();
        assert!(matches!(err, UpdateError::CouldNotProbeRepo { .. }));
        assert_eq!(mock.count(|c| matches!(c, ResolverCall::AddSource(_))), 0);
    }

    #[test]
    fn refresh_failure_removes_registration() {
        let mock = Arc::new(MockResolver::new());
        mock.set_refresh_ok(false);
        let mut s = session(&mock);
        let err = s.add().unwrap_err();
        assert!(matches!(err, UpdateError::CouldNotRefreshRepo { .. }));
        assert!(s.source_id().is_none());
        assert_eq!(
            mock.count(|c| *c == ResolverCall::DeleteSource(SourceId::new(1))),
            1
        );
    }

    #[test]
    fn release_runs_every_step_and_reports_first_error() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        s.add().unwrap();
        mock.set_delete_ok(false);

        assert!(s.release().is_err());
        assert!(s.source_id().is_none());
        assert_eq!(mock.count(|c| *c == ResolverCall::ReleaseAll), 1);
        assert_eq!(mock.count(|c| *c == ResolverCall::SaveAll), 1);
    }

    #[test]
    fn release_without_registration_still_persists() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        s.release().unwrap();
        assert_eq!(mock.count(|c| matches!(c, ResolverCall::DeleteSource(_))), 0);
        assert_eq!(mock.count(|c| *c == ResolverCall::SaveAll), 1);
    }

    #[test]
    fn registration_failure_is_a_refresh_error() {
        let mock = Arc::new(MockResolver::new());
        mock.set_add_source_ok(false);
        let mut s = session(&mock);

        match s.add().unwrap_err() {
            UpdateError::CouldNotRefreshRepo { reason, .. } => {
                assert!(reason.starts_with("registration failed"), "{reason}");
            }
            other => panic!("expected CouldNotRefreshRepo, got {other:?}"),
        }
        assert!(s.source_id().is_none());
        assert_eq!(mock.count(|c| matches!(c, ResolverCall::Refresh(_))), 0);

        mock.set_add_source_ok(true);
        assert_eq!(s.add().unwrap(), SourceId::new(1));
    }

    #[test]
    fn release_continues_past_release_all_failure() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        s.add().unwrap();
        mock.set_release_ok(false);

        let err = s.release().unwrap_err();
        assert!(err.to_string().contains("release_all"), "{err}");
        assert_eq!(
            mock.count(|c| *c == ResolverCall::DeleteSource(SourceId::new(1))),
            1
        );
        assert_eq!(mock.count(|c| *c == ResolverCall::SaveAll), 1);
    }

    #[test]
    fn release_reports_the_earliest_of_several_failures() {
        let mock = Arc::new(MockResolver::new());
        let mut s = session(&mock);
        s.add().unwrap();
        mock.set_release_ok(false);
        mock.set_save_ok(false);

        let err = s.release().unwrap_err();
        assert!(err.to_string().contains("release_all"), "{err}");
        assert_eq!(mock.count(|c| *c == ResolverCall::SaveAll), 1);
    }
}
