use anyhow::Result;
use std::io::Write;

use super::output::{OutputFormat, render_weather};
use crate::config::Config;
use crate::runtime::Runtime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WeatherKind {
    /// Hourly forecast, about 3 months back to 16 days ahead
    Hourly,
    /// 15-minutely forecast, about 3 months back to 16 days ahead
    Minutely,
    /// Hourly reanalysis from 1940 up to about 5 days ago
    Historical,
}

#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip(config, out))]
pub async fn weather<R: Runtime + 'static, W: Write>(
    config: &Config<R>,
    kind: WeatherKind,
    latitude: f64,
    longitude: f64,
    start_date: &str,
    end_date: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let service = config.weather_service();
    let frame = match kind {
        WeatherKind::Hourly => {
            service
                .get_hourly_weather(latitude, longitude, start_date, end_date)
                .await?
        }
        WeatherKind::Minutely => {
            service
                .get_minutely_weather(latitude, longitude, start_date, end_date)
                .await?
        }
        WeatherKind::Historical => {
            service
                .get_historical_weather(latitude, longitude, start_date, end_date)
                .await?
        }
    };

    render_weather(&frame, format, out)
}
