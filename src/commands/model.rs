use anyhow::Result;
use std::io::Write;

use crate::config::Config;
use crate::model::HubRepo;
use crate::runtime::Runtime;

/// Downloads a model file into the cache and prints its local path.
#[tracing::instrument(skip(config, out))]
pub async fn fetch_model<R: Runtime + 'static, W: Write>(
    config: &Config<R>,
    repo: &str,
    filename: &str,
    revision: &str,
    force: bool,
    out: &mut W,
) -> Result<()> {
    let repo: HubRepo = repo.parse()?;
    let path = config
        .model_hub()
        .fetch_model(&repo, filename, revision, force)
        .await?;
    writeln!(out, "{}", path.display())?;
    Ok(())
}
