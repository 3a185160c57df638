use super::{json_pretty, progress, spin_fail, spin_ok, CliError, Context, EXIT_SUCCESS};
use console::style;

pub fn run(ctx: &Context, uri: &str, user: bool) -> Result<u8, CliError> {
    let mut repo = ctx.open(uri, user)?;
    let pb = progress(ctx.json, &format!("reading {repo}"));
    let listed = repo.packages();
    if let Err(e) = repo.release() {
        tracing::warn!("failed to release {repo}: {e}");
    }
    let packages = match listed {
        Ok(p) => {
            spin_ok(&pb, &format!("{} package(s) in {repo}", p.len()));
            p
        }
        Err(e) => {
            spin_fail(&pb, &format!("cannot read {repo}"));
            return Err(e.into());
        }
    };

    if ctx.json {
        println!("{}", json_pretty(&packages)?);
    } else if packages.is_empty() {
        println!("no packages in {repo}");
    } else {
        println!("{}", style(format!("{:<32} PATH", "NAME")).bold());
        for p in &packages {
            println!("{:<32} {}", p.name, p.path);
        }
    }
    Ok(EXIT_SUCCESS)
}
