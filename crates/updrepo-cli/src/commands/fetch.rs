use super::{json_pretty, progress, spin_fail, spin_ok, CliError, Context, EXIT_SUCCESS};
use std::path::Path;

/// Build images for every package and leave them in `download_dir`.
pub fn run(ctx: &Context, uri: &str, user: bool, download_dir: &Path) -> Result<u8, CliError> {
    let mut repo = ctx.open(uri, user)?;
    let pb = progress(ctx.json, &format!("fetching updates from {repo}"));

    let fetched = repo.fetch(download_dir);
    let released = repo.release();
    let images = match fetched {
        Ok(images) => images,
        Err(e) => {
            spin_fail(&pb, &format!("fetch from {repo} failed"));
            if let Err(re) = released {
                tracing::warn!("failed to release {repo}: {re}");
            }
            return Err(e.into());
        }
    };
    released?;
    spin_ok(&pb, &format!("{} image(s) built", images.len()));

    if ctx.json {
        println!(
            "{}",
            json_pretty(&serde_json::json!({
                "repository": repo.to_string(),
                "images": images,
            }))?
        );
    } else {
        for image in &images {
            println!("{}", image.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
