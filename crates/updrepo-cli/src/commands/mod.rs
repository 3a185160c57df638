pub mod completions;
pub mod doctor;
pub mod fetch;
pub mod packages;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use updrepo_core::{Collaborators, UpdateError, UpdateRepository};
use updrepo_schema::{ConfigError, Origin, RepoUri, UpdateConfig, UriError};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_REPO_ERROR: u8 = 2;
pub const EXIT_APPLY_ERROR: u8 = 3;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid repository URI: {0}")]
    Uri(#[from] UriError),
    #[error("{0}")]
    Message(String),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Update(e) if e.is_repository_error() => EXIT_REPO_ERROR,
            Self::Update(e) if e.is_apply_error() => EXIT_APPLY_ERROR,
            _ => EXIT_FAILURE,
        }
    }
}

/// Settings shared by every command that opens a repository.
pub struct Context {
    pub config: UpdateConfig,
    pub state_dir: Option<PathBuf>,
    pub json: bool,
}

impl Context {
    pub fn open(&self, uri: &str, user: bool) -> Result<UpdateRepository, CliError> {
        let uri = RepoUri::parse(uri)?;
        let collaborators = Collaborators::system(&self.config, self.state_dir.as_deref());
        let origin = if user { Origin::User } else { Origin::Default };
        Ok(UpdateRepository::new(uri, collaborators)
            .with_origin(origin)
            .with_config(self.config.clone()))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<UpdateConfig, CliError> {
    match path {
        Some(p) => Ok(UpdateConfig::load(p)?),
        None => Ok(UpdateConfig::default()),
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Message(format!("JSON serialization failed: {e}")))
}

fn plain_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .map(|s| s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(plain_style());
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Spinner for human output; hidden when printing JSON.
pub fn progress(json: bool, msg: &str) -> ProgressBar {
    if json {
        ProgressBar::hidden()
    } else {
        spinner(msg)
    }
}
