use crate::concurrency::UpdatesLock;
use crate::UpdateError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use updrepo_runtime::{run_checked, CommandRunner, ToolCommand};
use updrepo_schema::ToolsSection;
use updrepo_store::{lock_file, next_mount_point, PartsManifest};

/// An image mounted into the running system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    pub image: PathBuf,
    pub mount_point: PathBuf,
}

/// Mounts images read-only and splices them into the live root.
pub struct ApplyEngine<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolsSection,
    parts: PartsManifest,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        tools: &'a ToolsSection,
        parts: PartsManifest,
    ) -> Self {
        Self {
            runner,
            tools,
            parts,
        }
    }

    /// Mount every image in order under `updates_root`, skipping images that
    /// already have a record in `mounted`. Returns how many were newly mounted.
    ///
    /// A record is pushed as soon as its mount succeeds, so an image is never
    /// mounted twice even when its splice failed. Stops at the first failure;
    /// mounts and manifest lines completed before it are left in place.
    pub fn apply(
        &self,
        images: &[PathBuf],
        updates_root: &Path,
        mounted: &mut Vec<MountRecord>,
    ) -> Result<usize, UpdateError> {
        let _lock = UpdatesLock::acquire(&lock_file(updates_root))?;
        let mut applied = 0;

        for image in images {
            if mounted.iter().any(|r| r.image == *image) {
                debug!("{} is already mounted, skipping", image.display());
                continue;
            }
            let mount_point = self.mount(image, updates_root)?;
            mounted.push(MountRecord {
                image: image.clone(),
                mount_point: mount_point.clone(),
            });
            self.splice(&mount_point)?;
            self.parts
                .append(image, &mount_point)
                .map_err(|e| UpdateError::CouldNotBeApplied {
                    mount_point: mount_point.clone(),
                    reason: e.to_string(),
                })?;
            info!("applied {} at {}", image.display(), mount_point.display());
            applied += 1;
        }
        Ok(applied)
    }

    fn mount(&self, image: &Path, updates_root: &Path) -> Result<PathBuf, UpdateError> {
        let mount_failed = |reason: String| UpdateError::CouldNotMountUpdate {
            image: image.to_path_buf(),
            reason,
        };

        let mount_point =
            next_mount_point(updates_root).map_err(|e| mount_failed(e.to_string()))?;
        fs::create_dir_all(&mount_point).map_err(|e| {
            mount_failed(format!("cannot create {}: {e}", mount_point.display()))
        })?;

        let cmd = ToolCommand::mount_image(&self.tools.mount, image, &mount_point);
        debug!("running {cmd}");
        run_checked(self.runner, &cmd).map_err(|e| mount_failed(e.to_string()))?;
        Ok(mount_point)
    }

    fn splice(&self, mount_point: &Path) -> Result<(), UpdateError> {
        let cmd = ToolCommand::adddir(&self.tools.adddir, mount_point, Path::new("/"));
        debug!("running {cmd}");
        run_checked(self.runner, &cmd).map_err(|e| UpdateError::CouldNotBeApplied {
            mount_point: mount_point.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
