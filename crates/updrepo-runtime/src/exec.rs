use crate::command::ToolCommand;
use crate::RuntimeError;
use tracing::debug;

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    #[inline]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_owned(),
        }
    }
}

/// Process-execution facility for external tools.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion. A non-zero exit is reported in the output,
    /// not as an error; errors mean the process could not be run at all.
    fn run(&self, cmd: &ToolCommand) -> Result<ExecOutput, RuntimeError>;
}

/// Run `cmd` and turn a non-zero exit into [`RuntimeError::CommandFailed`].
pub fn run_checked(
    runner: &dyn CommandRunner,
    cmd: &ToolCommand,
) -> Result<ExecOutput, RuntimeError> {
    let output = runner.run(cmd)?;
    if output.success() {
        Ok(output)
    } else {
        Err(RuntimeError::CommandFailed {
            command: cmd.to_string(),
            status: output.status_text(),
            stderr: output.stderr.trim().to_owned(),
        })
    }
}

/// Spawns real processes, without a shell, capturing stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ExecOutput, RuntimeError> {
        debug!("exec: {cmd}");
        let output = cmd
            .to_command()
            .output()
            .map_err(|source| RuntimeError::Spawn {
                program: cmd.program().to_string_lossy().into_owned(),
                source,
            })?;
        let result = ExecOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            debug!("{} exited with {}", cmd.program_name(), result.status_text());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_runner_captures_stdout() {
        let cmd = ToolCommand::new("echo").arg("hello world");
        let output = SystemRunner::new().run(&cmd).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello world");
    }

    #[test]
    fn system_runner_reports_non_zero_exit() {
        let cmd = ToolCommand::new("false");
        let output = SystemRunner::new().run(&cmd).unwrap();
        assert!(!output.success());
        assert_eq!(output.code, Some(1));
    }

    #[test]
    fn system_runner_missing_program_is_spawn_error() {
        let cmd = ToolCommand::new("/nonexistent/updrepo-tool");
        let result = SystemRunner::new().run(&cmd);
        assert!(matches!(result, Err(RuntimeError::Spawn { .. })));
    }

    #[test]
    fn run_checked_maps_failure() {
        let cmd = ToolCommand::new("sh").args(["-c", "echo broken >&2; exit 3"]);
        let result = run_checked(&SystemRunner::new(), &cmd);
        match result {
            Err(RuntimeError::CommandFailed { status, stderr, .. }) => {
                assert_eq!(status, "exit code 3");
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn status_text_for_signal() {
        let output = ExecOutput {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.status_text(), "terminated by signal");
    }
}
