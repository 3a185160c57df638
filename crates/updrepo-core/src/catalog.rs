use crate::UpdateError;
use tracing::debug;
use updrepo_remote::Resolver;
use updrepo_schema::{PackageDescriptor, ResolvableKind, SourceId};

/// Read-only view of the packages one source contributes.
pub struct PackageCatalog<'a> {
    resolver: &'a dyn Resolver,
}

impl<'a> PackageCatalog<'a> {
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        Self { resolver }
    }

    /// Packages from `source`, sorted by name. Entries with equal names keep
    /// the order the resolver reported them in.
    pub fn packages(&self, source: SourceId) -> Result<Vec<PackageDescriptor>, UpdateError> {
        let mut packages: Vec<PackageDescriptor> = self
            .resolver
            .list_resolvables(ResolvableKind::Package)?
            .into_iter()
            .filter(|p| p.source == source)
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("source {source} provides {} package(s)", packages.len());
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use updrepo_remote::MockResolver;

    fn pkg(name: &str, path: &str, source: u32) -> PackageDescriptor {
        PackageDescriptor::new(name, path, SourceId::new(source))
    }

    #[test]
    fn filters_by_source_and_sorts_by_name() {
        let mock = MockResolver::new();
        mock.set_resolvables(vec![
            pkg("pkg1", "./x86_64/pkg1-3.1.x86_64.rpm", 1),
            pkg("pkg2", "./x86_64/pkg2-3.1.x86_64.rpm", 2),
            pkg("pkg0", "./x86_64/pkg0-3.1.x86_64.rpm", 1),
        ]);
        let packages = PackageCatalog::new(&mock).packages(SourceId::new(1)).unwrap();
        let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["pkg0", "pkg1"]);
    }

    #[test]
    fn equal_names_keep_discovery_order() {
        let mock = MockResolver::new();
        mock.set_resolvables(vec![
            pkg("b", "b.rpm", 1),
            pkg("a", "a-2.rpm", 1),
            pkg("a", "a-1.rpm", 1),
        ]);
        let packages = PackageCatalog::new(&mock).packages(SourceId::new(1)).unwrap();
        let paths: Vec<&str> = packages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["a-2.rpm", "a-1.rpm", "b.rpm"]);
    }

    #[test]
    fn source_without_packages_is_empty() {
        let mock = MockResolver::new();
        mock.set_resolvables(vec![pkg("pkg2", "pkg2.rpm", 2)]);
        assert!(PackageCatalog::new(&mock)
            .packages(SourceId::new(1))
            .unwrap()
            .is_empty());
    }
}
