//! On-disk cache of processed weather frames, keyed by request.

use anyhow::{Context, Result};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::WeatherFrame;
use crate::runtime::Runtime;

pub struct WeatherCache<R: Runtime> {
    runtime: Arc<R>,
    dir: PathBuf,
}

impl<R: Runtime> WeatherCache<R> {
    /// Frames are stored as JSON files directly under `dir`.
    pub fn new(runtime: Arc<R>, dir: PathBuf) -> Self {
        Self { runtime, dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derives a stable key from the URL and the parameters, ignoring parameter order.
    pub fn key(url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(b"?");
        hasher.update(sorted.join("&").as_bytes());
        hex::encode(hasher.finalize())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Returns the cached frame, or None on a miss. Unreadable entries count as misses.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, key: &str) -> Option<WeatherFrame> {
        let path = self.path_for(key);
        if !self.runtime.exists(&path) {
            debug!("Weather cache miss for {}", key);
            return None;
        }

        let loaded = self
            .runtime
            .read_to_string(&path)
            .and_then(|content| Ok(serde_json::from_str::<WeatherFrame>(&content)?));

        match loaded {
            Ok(frame) => {
                debug!("Weather cache hit for {}", key);
                Some(frame)
            }
            Err(e) => {
                warn!("Ignoring unreadable weather cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    #[tracing::instrument(skip(self, frame))]
    pub fn put(&self, key: &str, frame: &WeatherFrame) -> Result<()> {
        self.runtime.create_dir_all(&self.dir)?;
        let content =
            serde_json::to_vec(frame).context("Failed to serialize weather frame for cache")?;
        self.runtime.write(&self.path_for(key), &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use chrono::DateTime;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_key_ignores_parameter_order() {
        let a = WeatherCache::<MockRuntime>::key(
            "https://example.com",
            &params(&[("latitude", "1"), ("longitude", "2")]),
        );
        let b = WeatherCache::<MockRuntime>::key(
            "https://example.com",
            &params(&[("longitude", "2"), ("latitude", "1")]),
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_depends_on_url_and_values() {
        let p = params(&[("latitude", "1")]);
        let a = WeatherCache::<MockRuntime>::key("https://a.example.com", &p);
        let b = WeatherCache::<MockRuntime>::key("https://b.example.com", &p);
        let c = WeatherCache::<MockRuntime>::key("https://a.example.com", &params(&[("latitude", "2")]));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_put_then_get_on_disk() {
        let dir = tempdir().unwrap();
        let cache = WeatherCache::new(Arc::new(RealRuntime), dir.path().join("weather"));
        let frame = WeatherFrame {
            dates: vec![DateTime::from_timestamp(1_717_200_000, 0).unwrap()],
            columns: vec![("temperature_2m".to_string(), vec![Some(12.5)])],
        };

        assert!(cache.get("abc").is_none());
        cache.put("abc", &frame).unwrap();
        assert_eq!(cache.get("abc"), Some(frame));
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/cache/weather/abc.json");
        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(path))
            .returning(|_| Ok("{not json".to_string()));

        let cache = WeatherCache::new(Arc::new(runtime), PathBuf::from("/cache/weather"));
        assert!(cache.get("abc").is_none());
    }
}
