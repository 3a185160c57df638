use super::{CliError, Context, EXIT_FAILURE, EXIT_SUCCESS};
use console::style;
use std::path::Path;
use updrepo_core::UpdatesLock;
use updrepo_schema::UpdateConfig;
use updrepo_store::{lock_file, PartsManifest};

pub fn run(ctx: &Context, updates_dir: Option<&Path>) -> Result<u8, CliError> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_prereqs(&ctx.config, &mut checks, &mut all_pass);
    check_parts_file(&ctx.config, &mut checks, &mut all_pass);
    let compression = match ctx.config.tools.compression() {
        Some(comp) => format!("Images use {comp} compression"),
        None => "Images use the mksquashfs default compression".to_owned(),
    };
    checks.push(Check::info("compression", &compression));
    if let Some(dir) = updates_dir {
        check_updates_lock(dir, &mut checks, &mut all_pass);
    }

    print_results(&checks, all_pass, ctx.json)
}

fn check_prereqs(config: &UpdateConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = updrepo_runtime::check_update_prereqs(&config.tools);
    if missing.is_empty() {
        checks.push(Check::pass("prereqs", "Update prerequisites satisfied"));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "prereqs",
            &updrepo_runtime::format_missing(&missing),
        ));
    }
}

fn check_parts_file(config: &UpdateConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let parts = &config.paths.parts_file;
    if !parts.is_file() {
        checks.push(Check::warn(
            "parts_file",
            &format!(
                "Parts manifest {} not found (will be created on first apply)",
                parts.display()
            ),
        ));
        return;
    }
    match PartsManifest::new(parts).entries() {
        Ok(entries) => checks.push(Check::pass(
            "parts_file",
            &format!(
                "Parts manifest {} lists {} tree(s)",
                parts.display(),
                entries.len()
            ),
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "parts_file",
                &format!("Parts manifest {} is unreadable: {e}", parts.display()),
            ));
        }
    }
}

fn check_updates_lock(dir: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match UpdatesLock::try_acquire(&lock_file(dir)) {
        Ok(Some(_)) => checks.push(Check::pass(
            "updates_lock",
            "Updates directory lock is free",
        )),
        Ok(None) => checks.push(Check::warn(
            "updates_lock",
            "Updates directory is locked by another process",
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "updates_lock",
                &format!("Cannot check updates lock: {e}"),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, CliError> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!("{}", super::json_pretty(&json)?);
    } else {
        println!("{}\n", style("updrepo doctor").bold());
        for check in checks {
            let icon = match check.status {
                "pass" => style("✓").green(),
                "fail" => style("✗").red(),
                "warn" => style("⚠").yellow(),
                _ => style("ℹ").dim(),
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
