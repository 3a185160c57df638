//! Execution layer for the external tools the update pipeline drives.
//!
//! External programs (mksquashfs, mount, adddir, bsdtar) are described as typed
//! [`ToolCommand`] values with structured arguments and never go through a
//! shell. A [`CommandRunner`] executes them; [`SystemRunner`] spawns real
//! processes and [`mock::MockRunner`] records commands and scripts exit codes
//! for tests. The crate also provides prerequisite checks and a command-based
//! payload extractor for formats the in-process tar reader cannot handle.

pub mod command;
pub mod exec;
pub mod extract;
pub mod mock;
pub mod prereq;

pub use command::ToolCommand;
pub use exec::{run_checked, CommandRunner, ExecOutput, SystemRunner};
pub use extract::{AutoExtractor, CommandExtractor};
pub use prereq::{check_update_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command `{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}
