//! Model downloads from a Hugging Face style hub.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::http::HttpClient;
use crate::runtime::Runtime;

/// Default hub base URL.
pub const HUB_URL: &str = "https://huggingface.co";

/// Repository identifier (owner/name format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HubRepo {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for HubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for HubRepo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
            bail!("Invalid repository '{}'. Expected 'owner/name'.", s)
        }
        Ok(HubRepo {
            owner: parts[0].to_string(),
            name: parts[1].to_string(),
        })
    }
}

/// Fetches model files into `<cache_dir>/models/<owner>/<name>/<revision>/`.
pub struct ModelHub<R: Runtime> {
    http: HttpClient,
    base_url: String,
    runtime: Arc<R>,
    cache_dir: PathBuf,
}

impl<R: Runtime> ModelHub<R> {
    pub fn new(http: HttpClient, base_url: Option<String>, runtime: Arc<R>, cache_dir: PathBuf) -> Self {
        Self {
            http,
            base_url: base_url.unwrap_or_else(|| HUB_URL.to_string()),
            runtime,
            cache_dir,
        }
    }

    pub fn local_path(&self, repo: &HubRepo, revision: &str, filename: &str) -> PathBuf {
        self.cache_dir
            .join("models")
            .join(&repo.owner)
            .join(&repo.name)
            .join(revision)
            .join(filename)
    }

    pub fn url(&self, repo: &HubRepo, revision: &str, filename: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.base_url.trim_end_matches('/'),
            repo,
            revision,
            filename
        )
    }

    /// Returns the local path of the file, downloading it unless it is already cached.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_model(
        &self,
        repo: &HubRepo,
        filename: &str,
        revision: &str,
        force: bool,
    ) -> Result<PathBuf> {
        check_relative("filename", filename)?;
        check_relative("revision", revision)?;

        let dest = self.local_path(repo, revision, filename);
        if self.runtime.exists(&dest) && !force {
            info!("Using cached model {:?}", dest);
            return Ok(dest);
        }

        let parent = dest
            .parent()
            .context("Model path has no parent directory")?;
        self.runtime.create_dir_all(parent)?;

        let file_name = dest
            .file_name()
            .context("Model path has no file name")?
            .to_string_lossy()
            .into_owned();
        let part = dest.with_file_name(format!("{}.part", file_name));

        let url = self.url(repo, revision, filename);
        info!("Downloading {} ...", url);

        let downloaded = self
            .http
            .download_file(&url, || self.runtime.create_file(&part))
            .await;

        let bytes = match downloaded {
            Ok(bytes) => bytes,
            Err(e) => {
                if self.runtime.exists(&part) {
                    let _ = self.runtime.remove_file(&part);
                }
                return Err(e.context(format!("Failed to download {}", url)));
            }
        };

        self.runtime.rename(&part, &dest)?;
        debug!("Saved {} bytes to {:?}", bytes, dest);

        Ok(dest)
    }
}

fn check_relative(what: &str, value: &str) -> Result<()> {
    let path = Path::new(value);
    if value.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("Invalid {} '{}'", what, value);
    }
    Ok(())
}
