use crate::command::ToolCommand;
use crate::exec::{run_checked, CommandRunner};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use updrepo_store::{PackageExtractor, StoreError, TarExtractor};

/// Extracts payloads by running `bsdtar`, which reads rpm, cpio and
/// compressed tar archives.
pub struct CommandExtractor {
    runner: Arc<dyn CommandRunner>,
    tool: PathBuf,
}

impl CommandExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>, tool: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            tool: tool.into(),
        }
    }
}

impl PackageExtractor for CommandExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dest_dir)?;
        let cmd = ToolCommand::bsdtar_extract(&self.tool, archive, dest_dir);
        run_checked(self.runner.as_ref(), &cmd).map_err(|e| StoreError::ExtractionFailed {
            archive: archive.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Picks an extractor from the archive's extension: plain `.tar` payloads are
/// unpacked in-process, everything else goes through `bsdtar`.
pub struct AutoExtractor {
    tar: TarExtractor,
    command: CommandExtractor,
}

impl AutoExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>, bsdtar: impl Into<PathBuf>) -> Self {
        Self {
            tar: TarExtractor::new(),
            command: CommandExtractor::new(runner, bsdtar),
        }
    }

    fn is_plain_tar(archive: &Path) -> bool {
        archive
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("tar"))
    }
}

impl PackageExtractor for AutoExtractor {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<(), StoreError> {
        if Self::is_plain_tar(archive) {
            self.tar.extract(archive, dest_dir)
        } else {
            self.command.extract(archive, dest_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    fn write_tar(path: &Path) {
        let mut builder = tar::Builder::new(fs::File::create(path).unwrap());
        let data = b"payload";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "etc/fix.conf", &data[..])
            .unwrap();
        builder.finish().unwrap();
    }

    #[test]
    fn command_extractor_runs_bsdtar() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let extractor = CommandExtractor::new(runner.clone(), "bsdtar");
        let out = dir.path().join("out");
        extractor
            .extract(&dir.path().join("pkg.rpm"), &out)
            .unwrap();
        assert!(out.is_dir());
        let calls = runner.calls_to("bsdtar");
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].get_args()[2].as_os_str(),
            dir.path().join("pkg.rpm").as_os_str()
        );
    }

    #[test]
    fn command_extractor_maps_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        runner.set_exit_code("bsdtar", 1);
        let extractor = CommandExtractor::new(runner, "bsdtar");
        let result = extractor.extract(&dir.path().join("pkg.rpm"), &dir.path().join("out"));
        assert!(matches!(result, Err(StoreError::ExtractionFailed { .. })));
    }

    #[test]
    fn auto_extractor_unpacks_tar_in_process() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.tar");
        write_tar(&archive);
        let runner = Arc::new(MockRunner::new());
        let extractor = AutoExtractor::new(runner.clone(), "bsdtar");

        let out = dir.path().join("out");
        extractor.extract(&archive, &out).unwrap();
        assert_eq!(fs::read(out.join("etc/fix.conf")).unwrap(), b"payload");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn auto_extractor_delegates_rpm_to_bsdtar() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(MockRunner::new());
        let extractor = AutoExtractor::new(runner.clone(), "bsdtar");
        extractor
            .extract(&dir.path().join("pkg1-3.1.x86_64.rpm"), &dir.path().join("out"))
            .unwrap();
        assert_eq!(runner.calls_to("bsdtar").len(), 1);
    }
}
