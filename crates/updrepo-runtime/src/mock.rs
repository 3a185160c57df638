use crate::command::ToolCommand;
use crate::exec::{CommandRunner, ExecOutput};
use crate::RuntimeError;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Test double for [`CommandRunner`].
///
/// Records every command and answers with a per-program exit code (default 0).
/// A successful `mksquashfs` call writes a small placeholder at its image
/// argument so later steps see a real file, as with the real tool.
#[derive(Debug, Default)]
pub struct MockRunner {
    calls: Mutex<Vec<ToolCommand>>,
    exit_codes: Mutex<HashMap<String, i32>>,
    unspawnable: Mutex<HashSet<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `program` (by file name) exit with `code`.
    pub fn set_exit_code(&self, program: &str, code: i32) {
        lock(&self.exit_codes).insert(program.to_owned(), code);
    }

    /// Make every call to `program` fail before it starts.
    pub fn fail_to_spawn(&self, program: &str) {
        lock(&self.unspawnable).insert(program.to_owned());
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        lock(&self.calls).clone()
    }

    /// Recorded calls to `program`, by file name.
    pub fn calls_to(&self, program: &str) -> Vec<ToolCommand> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.program_name() == program)
            .cloned()
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ExecOutput, RuntimeError> {
        lock(&self.calls).push(cmd.clone());
        let name = cmd.program_name();

        if lock(&self.unspawnable).contains(&name) {
            return Err(RuntimeError::Spawn {
                program: name,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock: not installed"),
            });
        }

        let code = lock(&self.exit_codes).get(&name).copied().unwrap_or(0);
        if code != 0 {
            return Ok(ExecOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: format!("mock: {name} failed"),
            });
        }

        if name == "mksquashfs" {
            if let Some(image) = cmd.get_args().get(1) {
                std::fs::write(image, b"hsqs-mock")?;
            }
        }
        Ok(ExecOutput::with_code(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn records_calls_and_succeeds_by_default() {
        let runner = MockRunner::new();
        let cmd = ToolCommand::adddir(Path::new("/sbin/adddir"), Path::new("/m"), Path::new("/"));
        let output = runner.run(&cmd).unwrap();
        assert!(output.success());
        assert_eq!(runner.calls(), vec![cmd]);
        assert_eq!(runner.calls_to("adddir").len(), 1);
        assert!(runner.calls_to("mount").is_empty());
    }

    #[test]
    fn scripted_exit_code() {
        let runner = MockRunner::new();
        runner.set_exit_code("mount", 32);
        let cmd = ToolCommand::mount_image(Path::new("mount"), Path::new("/i"), Path::new("/m"));
        let output = runner.run(&cmd).unwrap();
        assert_eq!(output.code, Some(32));
        assert!(output.stderr.contains("mount"));
    }

    #[test]
    fn successful_squash_creates_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("update_000");
        let runner = MockRunner::new();
        let cmd = ToolCommand::squash(Path::new("mksquashfs"), dir.path(), &image, None);
        runner.run(&cmd).unwrap();
        assert!(image.exists());
    }

    #[test]
    fn failed_squash_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("update_000");
        let runner = MockRunner::new();
        runner.set_exit_code("mksquashfs", 1);
        let cmd = ToolCommand::squash(Path::new("mksquashfs"), dir.path(), &image, None);
        assert!(!runner.run(&cmd).unwrap().success());
        assert!(!image.exists());
    }

    #[test]
    fn unspawnable_program_errors() {
        let runner = MockRunner::new();
        runner.fail_to_spawn("bsdtar");
        let cmd = ToolCommand::new("bsdtar");
        assert!(matches!(runner.run(&cmd), Err(RuntimeError::Spawn { .. })));
        assert_eq!(runner.calls().len(), 1);
    }
}
