use super::{json_pretty, progress, spin_fail, spin_ok, CliError, Context, EXIT_SUCCESS};
use std::path::Path;
use updrepo_core::{UpdateError, UpdateRepository};

/// Fetch and apply in one go. Any failure removes the fetched images and the
/// source registration before the error is reported.
pub fn run(
    ctx: &Context,
    uri: &str,
    user: bool,
    download_dir: &Path,
    updates_dir: &Path,
) -> Result<u8, CliError> {
    let mut repo = ctx.open(uri, user)?;

    let pb = progress(ctx.json, &format!("fetching updates from {repo}"));
    let images = match repo.fetch(download_dir) {
        Ok(images) => images,
        Err(e) => {
            spin_fail(&pb, &format!("fetch from {repo} failed"));
            return Err(clean_up(&mut repo, e));
        }
    };
    spin_ok(&pb, &format!("{} image(s) built", images.len()));

    let pb = progress(ctx.json, &format!("applying updates from {repo}"));
    let records = match repo.apply(updates_dir) {
        Ok(records) => records,
        Err(e) => {
            spin_fail(&pb, "applying updates failed");
            return Err(clean_up(&mut repo, e));
        }
    };
    spin_ok(&pb, &format!("{} update(s) applied", records.len()));
    repo.release()?;

    if ctx.json {
        let mounts: Vec<_> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "image": r.image,
                    "mount_point": r.mount_point,
                })
            })
            .collect();
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "repository": repo.to_string(),
                "mounts": mounts,
            }))?
        );
    } else {
        for r in &records {
            println!("{} -> {}", r.image.display(), r.mount_point.display());
        }
    }
    Ok(EXIT_SUCCESS)
}

fn clean_up(repo: &mut UpdateRepository, cause: UpdateError) -> CliError {
    if let Err(e) = repo.cleanup() {
        tracing::warn!("cleanup of {repo} incomplete: {e}");
    }
    cause.into()
}
