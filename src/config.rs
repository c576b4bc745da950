use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::http::HttpClient;
use crate::model::ModelHub;
use crate::runtime::Runtime;
use crate::weather::{OpenMeteoClient, WeatherCache, WeatherService};

/// Request timeout for all API calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Values supplied on the command line. Anything left unset falls back to the
/// environment and then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cache_dir: Option<PathBuf>,
    pub forecast_url: Option<String>,
    pub archive_url: Option<String>,
    pub hub_url: Option<String>,
}

pub struct Config<R: Runtime> {
    pub runtime: Arc<R>,
    /// Client for the weather APIs. Never carries credentials.
    pub http: HttpClient,
    /// Client for the model hub, with the `HF_TOKEN` bearer header when set.
    pub hub_http: HttpClient,
    pub cache_dir: PathBuf,
    pub forecast_url: Option<String>,
    pub archive_url: Option<String>,
    pub hub_url: Option<String>,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, overrides: Overrides) -> Result<Self> {
        let mut hub_headers = HeaderMap::new();
        if let Ok(token) = runtime.env_var("HF_TOKEN") {
            if !token.is_empty() {
                let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("HF_TOKEN contains invalid characters")?;
                auth_value.set_sensitive(true);
                hub_headers.insert(AUTHORIZATION, auth_value);
                debug!("Using HF_TOKEN for model hub authentication");
            }
        }

        let client = build_client(HeaderMap::new())?;
        let hub_client = build_client(hub_headers)?;

        let env_or = |value: Option<String>, key: &str| {
            value.or_else(|| runtime.env_var(key).ok().filter(|v| !v.is_empty()))
        };

        let forecast_url = env_or(overrides.forecast_url, "PVCAST_FORECAST_URL");
        let archive_url = env_or(overrides.archive_url, "PVCAST_ARCHIVE_URL");
        let hub_url = env_or(overrides.hub_url, "PVCAST_HUB_URL");

        let cache_dir = match overrides.cache_dir {
            Some(dir) => dir,
            None => match env_or(None, "PVCAST_CACHE_DIR") {
                Some(dir) => PathBuf::from(dir),
                None => runtime
                    .cache_dir()
                    .map(|d| d.join("pvcast"))
                    .context("Could not determine a cache directory; pass --cache-dir")?,
            },
        };
        debug!("Using cache directory {:?}", cache_dir);

        Ok(Self {
            runtime: Arc::new(runtime),
            http: HttpClient::new(client),
            hub_http: HttpClient::new(hub_client),
            cache_dir,
            forecast_url,
            archive_url,
            hub_url,
        })
    }

    /// Weather service with the hourly forecast cache under `<cache_dir>/weather`.
    pub fn weather_service(&self) -> WeatherService<OpenMeteoClient, R> {
        WeatherService::new(OpenMeteoClient::new(self.http.clone()))
            .with_urls(self.forecast_url.clone(), self.archive_url.clone())
            .with_cache(WeatherCache::new(
                self.runtime.clone(),
                self.cache_dir.join("weather"),
            ))
    }

    pub fn model_hub(&self) -> ModelHub<R> {
        ModelHub::new(
            self.hub_http.clone(),
            self.hub_url.clone(),
            self.runtime.clone(),
            self.cache_dir.clone(),
        )
    }
}

fn build_client(headers: HeaderMap) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("pvcast/", env!("PVCAST_VERSION")))
        .default_headers(headers)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")
}
