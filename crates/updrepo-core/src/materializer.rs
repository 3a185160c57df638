use crate::UpdateError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use updrepo_remote::PackageDownloader;
use updrepo_runtime::{run_checked, CommandRunner, ToolCommand};
use updrepo_schema::{PackageDescriptor, ToolsSection};
use updrepo_store::{next_image_path, PackageExtractor};

const TEMP_PREFIX: &str = "updrepo-";

/// Turns one package into one squashfs image.
///
/// The downloaded payload and the extracted tree live in scoped temporaries
/// that are removed on every exit path. The only artifact that can outlive a
/// call is the finished image; a failed compression removes its partial output.
pub struct PackageMaterializer<'a> {
    repo: String,
    downloader: &'a dyn PackageDownloader,
    extractor: &'a dyn PackageExtractor,
    runner: &'a dyn CommandRunner,
    tools: &'a ToolsSection,
}

impl<'a> PackageMaterializer<'a> {
    /// `repo` is the redacted repository text used in errors.
    pub fn new(
        repo: impl Into<String>,
        downloader: &'a dyn PackageDownloader,
        extractor: &'a dyn PackageExtractor,
        runner: &'a dyn CommandRunner,
        tools: &'a ToolsSection,
    ) -> Self {
        Self {
            repo: repo.into(),
            downloader,
            extractor,
            runner,
            tools,
        }
    }

    fn failed(
        &self,
        package: &PackageDescriptor,
        what: &str,
        err: impl std::fmt::Display,
    ) -> UpdateError {
        UpdateError::CouldNotFetchUpdate {
            repo: self.repo.clone(),
            reason: format!("{}: {what}: {err}", package.name),
        }
    }

    /// Download, extract and squash `package` into a new image under `dest_dir`.
    pub fn fetch(
        &self,
        package: &PackageDescriptor,
        dest_dir: &Path,
    ) -> Result<PathBuf, UpdateError> {
        fs::create_dir_all(dest_dir)
            .map_err(|e| self.failed(package, "cannot create download directory", e))?;

        // Keep the payload's extension so the extractor can pick a format.
        let suffix = package
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let payload = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| self.failed(package, "cannot create temporary file", e))?;

        debug!("downloading {} to {}", package.name, payload.path().display());
        self.downloader
            .download(package.source, &package.name, payload.path())
            .map_err(|e| self.failed(package, "download failed", e))?;

        let tree = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|e| self.failed(package, "cannot create temporary directory", e))?;

        debug!("extracting {} into {}", package.name, tree.path().display());
        self.extractor
            .extract(payload.path(), tree.path())
            .map_err(|e| self.failed(package, "extraction failed", e))?;

        let image = next_image_path(dest_dir)
            .map_err(|e| self.failed(package, "cannot name image", e))?;
        let cmd = ToolCommand::squash(
            &self.tools.mksquashfs,
            tree.path(),
            &image,
            self.tools.compression(),
        );
        debug!("running {cmd}");
        if let Err(e) = run_checked(self.runner, &cmd) {
            discard_partial(&image);
            return Err(self.failed(package, "compression failed", e));
        }
        if !image.is_file() {
            return Err(self.failed(
                package,
                "compression failed",
                format!("no image was written to {}", image.display()),
            ));
        }

        info!("built {} from {}", image.display(), package.name);
        Ok(image)
    }
}

fn discard_partial(image: &Path) {
    match fs::remove_file(image) {
        Ok(()) => debug!("removed partial image {}", image.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove partial image {}: {e}", image.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use updrepo_remote::MockResolver;
    use updrepo_runtime::mock::MockRunner;
    use updrepo_schema::SourceId;
    use updrepo_store::StoreError;

    /// Records the archive it was handed and drops one file into the tree.
    #[derive(Default)]
    struct RecordingExtractor {
        seen: std::sync::Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl PackageExtractor for RecordingExtractor {
        fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), StoreError> {
            self.seen.lock().unwrap().push(archive.to_path_buf());
            if self.fail {
                return Err(StoreError::ExtractionFailed {
                    archive: archive.to_path_buf(),
                    reason: "truncated".to_owned(),
                });
            }
            fs::write(dest_dir.join("payload"), fs::read(archive)?)?;
            Ok(())
        }
    }

    fn package() -> PackageDescriptor {
        PackageDescriptor::new("pkg1", "./x86_64/pkg1-3.1.x86_64.rpm", SourceId::new(1))
    }

    #[test]
    fn builds_one_image_per_package() {
        let dest = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new();
        let extractor = RecordingExtractor::default();
        let runner = MockRunner::new();
        let tools = ToolsSection::default();
        let m = PackageMaterializer::new("http://h/r", &resolver, &extractor, &runner, &tools);

        let image = m.fetch(&package(), dest.path()).unwrap();
        assert_eq!(image, dest.path().join("update_000"));
        assert!(image.is_file());

        let seen = extractor.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].to_string_lossy().ends_with(".rpm"));
        assert!(!seen[0].exists(), "downloaded payload must be removed");

        let squash = runner.calls_to("mksquashfs");
        assert_eq!(squash.len(), 1);
        let args = squash[0].get_args();
        assert_eq!(args[1].as_os_str(), image.as_os_str());
        assert!(!Path::new(&args[0]).exists(), "extracted tree must be removed");
        assert!(squash[0].to_string().contains("-comp xz"));

        let second = m.fetch(&package(), dest.path()).unwrap();
        assert_eq!(second, dest.path().join("update_001"));
    }

    #[test]
    fn download_failure_is_fetch_error() {
        let dest = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new();
        resolver.fail_download("pkg1");
        let extractor = RecordingExtractor::default();
        let runner = MockRunner::new();
        let tools = ToolsSection::default();
        let m = PackageMaterializer::new("http://h/r", &resolver, &extractor, &runner, &tools);

        let err = m.fetch(&package(), dest.path()).unwrap_err();
        assert!(matches!(err, UpdateError::CouldNotFetchUpdate { .. }));
        assert!(extractor.seen.lock().unwrap().is_empty());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn extraction_failure_is_fetch_error() {
        let dest = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new();
        let extractor = RecordingExtractor {
            fail: true,
            ..Default::default()
        };
        let runner = MockRunner::new();
        let tools = ToolsSection::default();
        let m = PackageMaterializer::new("http://h/r", &resolver, &extractor, &runner, &tools);

        let err = m.fetch(&package(), dest.path()).unwrap_err();
        assert!(matches!(err, UpdateError::CouldNotFetchUpdate { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn compression_failure_leaves_no_image() {
        let dest = tempfile::tempdir().unwrap();
        let resolver = MockResolver::new();
        let extractor = RecordingExtractor::default();
        let runner = MockRunner::new();
        runner.set_exit_code("mksquashfs", 1);
        let tools = ToolsSection::default();
        let m = PackageMaterializer::new("http://h/r", &resolver, &extractor, &runner, &tools);

        let err = m.fetch(&package(), dest.path()).unwrap_err();
        assert!(matches!(err, UpdateError::CouldNotFetchUpdate { .. }));
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
