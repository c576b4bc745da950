use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};

use super::cache::WeatherCache;
use super::client::WeatherApi;
use super::types::{RawResponse, WeatherFrame};
use super::{
    ARCHIVE_URL, FORECAST_URL, HOURLY_VARIABLES, MINUTELY_15_VARIABLES, Resolution,
    ValidationError,
};
use crate::runtime::Runtime;

/// Date format accepted for `start_date` and `end_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// High-level access to forecast and historical weather.
pub struct WeatherService<A: WeatherApi, R: Runtime> {
    api: A,
    forecast_url: String,
    archive_url: String,
    cache: Option<WeatherCache<R>>,
}

impl<A: WeatherApi, R: Runtime> WeatherService<A, R> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            forecast_url: FORECAST_URL.to_string(),
            archive_url: ARCHIVE_URL.to_string(),
            cache: None,
        }
    }

    pub fn with_urls(mut self, forecast_url: Option<String>, archive_url: Option<String>) -> Self {
        if let Some(url) = forecast_url {
            self.forecast_url = url;
        }
        if let Some(url) = archive_url {
            self.archive_url = url;
        }
        self
    }

    /// Enables caching of hourly forecasts.
    pub fn with_cache(mut self, cache: WeatherCache<R>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Hourly weather from about 3 months ago up to 16 days ahead.
    #[tracing::instrument(skip(self))]
    pub async fn get_hourly_weather(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: &str,
        end_date: &str,
    ) -> Result<WeatherFrame> {
        validate_coordinates(latitude, longitude)?;
        validate_date_range(start_date, end_date)?;

        let mut params = base_params(latitude, longitude, start_date, end_date);
        params.push(variables_param(Resolution::Hourly, HOURLY_VARIABLES));
        params.push(("timezone".to_string(), "GMT".to_string()));

        let key = WeatherCache::<R>::key(&self.forecast_url, &params);
        if let Some(frame) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            info!("Using cached hourly weather for ({}, {})", latitude, longitude);
            return Ok(frame);
        }

        let raw = self.api.fetch(&self.forecast_url, &params).await?;
        let frame = process(&raw, Resolution::Hourly, HOURLY_VARIABLES)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &frame) {
                warn!("Failed to cache hourly weather: {}", e);
            }
        }

        Ok(frame)
    }

    /// 15-minutely weather from about 3 months ago up to 16 days ahead.
    #[tracing::instrument(skip(self))]
    pub async fn get_minutely_weather(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: &str,
        end_date: &str,
    ) -> Result<WeatherFrame> {
        validate_coordinates(latitude, longitude)?;
        validate_date_range(start_date, end_date)?;

        let mut params = base_params(latitude, longitude, start_date, end_date);
        params.push(variables_param(Resolution::Minutely15, MINUTELY_15_VARIABLES));
        params.push(("timezone".to_string(), "GMT".to_string()));

        let raw = self.api.fetch(&self.forecast_url, &params).await?;
        process(&raw, Resolution::Minutely15, MINUTELY_15_VARIABLES)
    }

    /// Hourly reanalysis weather from 1940 up to about 5 days ago.
    #[tracing::instrument(skip(self))]
    pub async fn get_historical_weather(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: &str,
        end_date: &str,
    ) -> Result<WeatherFrame> {
        validate_coordinates(latitude, longitude)?;
        validate_date_range(start_date, end_date)?;

        let mut params = base_params(latitude, longitude, start_date, end_date);
        params.push(variables_param(Resolution::Hourly, MINUTELY_15_VARIABLES));

        let raw = self.api.fetch(&self.archive_url, &params).await?;
        process(&raw, Resolution::Hourly, MINUTELY_15_VARIABLES)
    }
}

fn base_params(
    latitude: f64,
    longitude: f64,
    start_date: &str,
    end_date: &str,
) -> Vec<(String, String)> {
    vec![
        ("latitude".to_string(), latitude.to_string()),
        ("longitude".to_string(), longitude.to_string()),
        ("start_date".to_string(), start_date.to_string()),
        ("end_date".to_string(), end_date.to_string()),
        ("timeformat".to_string(), "unixtime".to_string()),
    ]
}

fn variables_param(resolution: Resolution, variables: &[&str]) -> (String, String) {
    (resolution.api_key().to_string(), variables.join(","))
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    let lat_ok = (-90.0..=90.0).contains(&latitude);
    let lon_ok = (-180.0..=180.0).contains(&longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        ValidationError::InvalidDate(format!("'{}' is not in YYYY-MM-DD format", value))
    })
}

pub fn validate_date_range(start_date: &str, end_date: &str) -> Result<(), ValidationError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    if end < start {
        return Err(ValidationError::InvalidDate(format!(
            "end date {} is before start date {}",
            end_date, start_date
        )));
    }
    Ok(())
}

/// Turns one section of a raw response into a frame with columns in `variables` order.
pub fn process(
    raw: &RawResponse,
    resolution: Resolution,
    variables: &[&str],
) -> Result<WeatherFrame> {
    let series = match resolution {
        Resolution::Hourly => raw.hourly.as_ref(),
        Resolution::Minutely15 => raw.minutely_15.as_ref(),
    }
    .ok_or_else(|| anyhow!("Response has no '{}' section", resolution.api_key()))?;

    let dates = series
        .time
        .iter()
        .map(|&t| {
            DateTime::<Utc>::from_timestamp(t, 0)
                .ok_or_else(|| anyhow!("Invalid timestamp {} in weather response", t))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = Vec::with_capacity(variables.len());
    for &name in variables {
        let values = series
            .variables
            .get(name)
            .with_context(|| format!("Response is missing variable '{}'", name))?;
        if values.len() != dates.len() {
            bail!(
                "Variable '{}' has {} values but there are {} timestamps",
                name,
                values.len(),
                dates.len()
            );
        }
        columns.push((name.to_string(), values.clone()));
    }

    debug!(
        "Processed {} {} rows with {} variables",
        dates.len(),
        resolution.api_key(),
        columns.len()
    );

    Ok(WeatherFrame { dates, columns })
}
