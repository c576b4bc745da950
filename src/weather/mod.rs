//! Weather data from the Open-Meteo API.
//!
//! - `types` - Raw API payloads and the processed [`WeatherFrame`]
//! - `client` - The [`WeatherApi`] seam and its HTTP implementation
//! - `cache` - On-disk cache for hourly forecasts
//! - `service` - Validation and the high-level [`WeatherService`]

mod cache;
mod client;
mod service;
mod types;

use std::fmt;

pub use cache::WeatherCache;
pub use client::{OpenMeteoClient, WeatherApi};
pub use service::{WeatherService, process};
pub use types::{RawResponse, RawSeries, WeatherFrame};

#[cfg(test)]
pub use client::MockWeatherApi;

/// Default forecast endpoint.
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Default historical archive endpoint.
pub const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Variables requested for hourly forecasts.
pub const HOURLY_VARIABLES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "dew_point_2m",
    "precipitation",
    "surface_pressure",
    "cloud_cover",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "visibility",
    "wind_speed_10m",
    "wind_speed_80m",
    "wind_speed_120m",
    "wind_speed_180m",
    "wind_direction_10m",
    "wind_direction_80m",
    "wind_direction_120m",
    "wind_direction_180m",
    "is_day",
    "sunshine_duration",
    "shortwave_radiation",
    "direct_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "terrestrial_radiation",
];

/// Variables requested for 15-minutely forecasts and historical data.
/// The power model is trained on exactly these columns, in this order.
pub const MINUTELY_15_VARIABLES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "dew_point_2m",
    "precipitation",
    "surface_pressure",
    "cloud_cover",
    "cloud_cover_low",
    "cloud_cover_mid",
    "cloud_cover_high",
    "wind_speed_10m",
    "wind_direction_10m",
    "is_day",
    "shortwave_radiation",
    "direct_radiation",
    "diffuse_radiation",
    "direct_normal_irradiance",
    "terrestrial_radiation",
];

/// Time step of a weather series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hourly,
    Minutely15,
}

impl Resolution {
    /// Name of the query parameter and of the response section.
    pub fn api_key(&self) -> &'static str {
        match self {
            Resolution::Hourly => "hourly",
            Resolution::Minutely15 => "minutely_15",
        }
    }
}

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidCoordinates { latitude: f64, longitude: f64 },
    InvalidDate(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCoordinates {
                latitude,
                longitude,
            } => write!(
                f,
                "Invalid coordinates ({}, {}). Latitude must be between -90 and 90, and longitude must be between -180 and 180.",
                latitude, longitude
            ),
            ValidationError::InvalidDate(msg) => write!(f, "Invalid date: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}
