mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{CliError, Context, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use updrepo_core::install_signal_handler;

#[derive(Debug, Parser)]
#[command(
    name = "updrepo",
    version,
    about = "Fetch, squash and mount update repositories for an installer's runtime system"
)]
struct Cli {
    /// TOML configuration file (tool paths, parts manifest, probe path).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory where the resolver persists registered sources.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the packages an update repository provides.
    Packages {
        /// Repository URI (http://, https://, dir://, cd:/, ...).
        uri: String,
        /// Treat the repository as user supplied.
        #[arg(long, default_value_t = false)]
        user: bool,
    },
    /// Build one squashfs image per package.
    Fetch {
        /// Repository URI.
        uri: String,
        /// Directory that receives the images.
        #[arg(long)]
        download_dir: PathBuf,
        #[arg(long, default_value_t = false)]
        user: bool,
    },
    /// Fetch the images, mount them and splice them into the running root.
    Update {
        /// Repository URI.
        uri: String,
        /// Directory that receives the images.
        #[arg(long)]
        download_dir: PathBuf,
        /// Directory under which images are mounted.
        #[arg(long)]
        updates_dir: PathBuf,
        #[arg(long, default_value_t = false)]
        user: bool,
    },
    /// Check that the tools and privileges needed for updates are present.
    Doctor {
        /// Also check the lock of this updates directory.
        #[arg(long)]
        updates_dir: Option<PathBuf>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("UPDREPO_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let needs_tools = matches!(cli.command, Commands::Fetch { .. } | Commands::Update { .. });
    if needs_tools && std::env::var("UPDREPO_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = updrepo_runtime::check_update_prereqs(&config.tools);
        if !missing.is_empty() {
            eprintln!("error: {}", updrepo_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let ctx = Context {
        config,
        state_dir: cli.state_dir,
        json: cli.json,
    };

    let result: Result<u8, CliError> = match cli.command {
        Commands::Packages { uri, user } => commands::packages::run(&ctx, &uri, user),
        Commands::Fetch {
            uri,
            download_dir,
            user,
        } => commands::fetch::run(&ctx, &uri, user, &download_dir),
        Commands::Update {
            uri,
            download_dir,
            updates_dir,
            user,
        } => commands::update::run(&ctx, &uri, user, &download_dir, &updates_dir),
        Commands::Doctor { updates_dir } => commands::doctor::run(&ctx, updates_dir.as_deref()),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
