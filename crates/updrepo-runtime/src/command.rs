use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// An external program invocation with structured arguments.
///
/// Arguments are passed to the process verbatim; nothing is interpolated
/// into a shell string, so paths with spaces or quotes need no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[inline]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[inline]
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Final path component of the program (`/sbin/adddir` -> `adddir`).
    pub fn program_name(&self) -> String {
        self.program.file_name().map_or_else(
            || self.program.to_string_lossy().into_owned(),
            |n| n.to_string_lossy().into_owned(),
        )
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Compress `source_dir` into a single read-only squashfs `image`.
    pub fn squash(
        tool: &Path,
        source_dir: &Path,
        image: &Path,
        compression: Option<&str>,
    ) -> Self {
        let cmd = Self::new(tool)
            .arg(source_dir)
            .arg(image)
            .args(["-noappend", "-no-progress"]);
        match compression {
            Some(comp) => cmd.arg("-comp").arg(comp),
            None => cmd,
        }
    }

    /// Loop-mount `image` read-only at `mount_point`.
    pub fn mount_image(tool: &Path, image: &Path, mount_point: &Path) -> Self {
        Self::new(tool)
            .args(["-o", "loop,ro"])
            .arg(image)
            .arg(mount_point)
    }

    /// Splice the tree at `dir` into `target` of the running system.
    pub fn adddir(tool: &Path, dir: &Path, target: &Path) -> Self {
        Self::new(tool).arg(dir).arg(target)
    }

    /// Unpack `archive` (rpm, cpio, compressed tar, ...) into `dest_dir`.
    pub fn bsdtar_extract(tool: &Path, archive: &Path, dest_dir: &Path) -> Self {
        Self::new(tool)
            .args(["-x", "-f"])
            .arg(archive)
            .arg("-C")
            .arg(dest_dir)
    }
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ',' | '=' | ':'));
    if plain {
        s.to_owned()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}

/// Shell-quoted rendering, for logs and error messages only.
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}
