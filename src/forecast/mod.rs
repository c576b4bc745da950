//! Power forecasts for a PV site.

mod features;

use anyhow::{Result, bail};
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use features::{DATE_COLUMNS, PANEL_COLUMNS, build_features};

use crate::model::Regressor;
use crate::runtime::Runtime;
use crate::site::PvSite;
use crate::weather::{WeatherApi, WeatherService};

/// Length of a forecast window.
pub const FORECAST_HORIZON_HOURS: i64 = 48;

/// Days of weather fetched from the start date onwards.
pub const FETCH_DAYS: u64 = 2;

/// Forecast weather is only kept for roughly this many days into the past.
pub const MAX_HISTORY_DAYS: u64 = 90;

/// Predicted power for one 15-minute step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerPoint {
    pub date: DateTime<Utc>,
    pub power_kw: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// The start date lies beyond the forecast archive.
    NoForecastData { start_date: NaiveDate },
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::NoForecastData { start_date } => write!(
                f,
                "Start date ({}) is more than {} days ago, no forecast data available",
                start_date, MAX_HISTORY_DAYS
            ),
        }
    }
}

impl std::error::Error for ForecastError {}

/// Combines weather, site and model into power predictions.
pub struct SolarPowerPredictor<A: WeatherApi, R: Runtime, M: Regressor> {
    weather: WeatherService<A, R>,
    model: M,
    runtime: Arc<R>,
}

impl<A: WeatherApi, R: Runtime, M: Regressor> SolarPowerPredictor<A, R, M> {
    pub fn new(weather: WeatherService<A, R>, model: M, runtime: Arc<R>) -> Self {
        Self {
            weather,
            model,
            runtime,
        }
    }

    /// Predicts power every 15 minutes from `start_date` through `start_date + 2 days`.
    #[tracing::instrument(skip(self))]
    pub async fn predict_power_output(
        &self,
        site: &PvSite,
        start_date: NaiveDate,
    ) -> Result<Vec<PowerPoint>> {
        site.validate()?;

        let today = self.runtime.now().date_naive();
        if today
            .checked_sub_days(Days::new(MAX_HISTORY_DAYS))
            .is_some_and(|limit| start_date < limit)
        {
            return Err(ForecastError::NoForecastData { start_date }.into());
        }

        let end_date = start_date + Days::new(FETCH_DAYS);
        info!("Using start date: {}", start_date);

        let frame = self
            .weather
            .get_minutely_weather(
                site.latitude,
                site.longitude,
                &start_date.to_string(),
                &end_date.to_string(),
            )
            .await?;

        let features = build_features(site, &frame)?;
        let predictions = self.model.predict(&features)?;
        if predictions.len() != frame.len() {
            bail!(
                "Model returned {} predictions for {} rows",
                predictions.len(),
                frame.len()
            );
        }

        debug!("Predicted {} steps", predictions.len());

        Ok(frame
            .dates
            .iter()
            .zip(predictions)
            .map(|(&date, power_kw)| PowerPoint { date, power_kw })
            .collect())
    }

    /// Forecast for the 48 hours starting at `ts`, or at now floored to 15 minutes.
    #[tracing::instrument(skip(self))]
    pub async fn run_forecast(
        &self,
        site: &PvSite,
        ts: Option<DateTime<Utc>>,
    ) -> Result<Vec<PowerPoint>> {
        let start = ts.unwrap_or_else(|| floor_to_15_minutes(self.runtime.now()));
        let end = start + Duration::hours(FORECAST_HORIZON_HOURS);

        let mut points: Vec<PowerPoint> = self
            .predict_power_output(site, start.date_naive())
            .await?
            .into_iter()
            .filter(|p| p.date >= start && p.date < end)
            .collect();
        points.sort_by_key(|p| p.date);

        Ok(points)
    }
}

/// Rounds down to the previous quarter hour and drops sub-minute precision.
pub fn floor_to_15_minutes(ts: DateTime<Utc>) -> DateTime<Utc> {
    let minute = ts.minute() - ts.minute() % 15;
    ts.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DD`. Naive values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    bail!(
        "Invalid timestamp '{}'. Use RFC 3339, 'YYYY-MM-DD HH:MM' or 'YYYY-MM-DD'.",
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockRegressor;
    use crate::runtime::MockRuntime;
    use crate::weather::{MINUTELY_15_VARIABLES, MockWeatherApi, RawResponse, RawSeries};
    use std::collections::HashMap;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn runtime_at(now: DateTime<Utc>) -> Arc<MockRuntime> {
        let mut runtime = MockRuntime::new();
        runtime.expect_now().returning(move || now);
        Arc::new(runtime)
    }

    /// Three days of 15-minute steps starting at midnight of `start`.
    fn minutely_response(start: DateTime<Utc>) -> RawResponse {
        let time: Vec<i64> = (0..3 * 96).map(|i| start.timestamp() + i * 900).collect();
        let n = time.len();
        let variables: HashMap<String, Vec<Option<f64>>> = MINUTELY_15_VARIABLES
            .iter()
            .map(|v| (v.to_string(), vec![Some(1.0); n]))
            .collect();
        RawResponse {
            minutely_15: Some(RawSeries { time, variables }),
            ..Default::default()
        }
    }

    fn site() -> PvSite {
        PvSite::new(51.75, -1.25, 1.25, None, None).unwrap()
    }

    /// Predicts the row's hour so results can be traced back to timestamps.
    fn hour_model() -> MockRegressor {
        let mut model = MockRegressor::new();
        model.expect_predict().returning(|features| {
            let hour = features.column_index("hour").unwrap();
            Ok(features.rows().iter().map(|r| r[hour].unwrap()).collect())
        });
        model
    }

    #[test]
    fn test_floor_to_15_minutes() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 10, 44, 59).unwrap();
        assert_eq!(floor_to_15_minutes(ts), utc(2024, 6, 1, 10, 30));
        assert_eq!(floor_to_15_minutes(utc(2024, 6, 1, 10, 0)), utc(2024, 6, 1, 10, 0));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-06-01T10:30:00Z").unwrap(),
            utc(2024, 6, 1, 10, 30)
        );
        assert_eq!(
            parse_timestamp("2024-06-01T12:30:00+02:00").unwrap(),
            utc(2024, 6, 1, 10, 30)
        );
        assert_eq!(parse_timestamp("2024-06-01 10:30").unwrap(), utc(2024, 6, 1, 10, 30));
        assert_eq!(parse_timestamp("2024-06-01").unwrap(), utc(2024, 6, 1, 0, 0));
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_predict_power_output_requests_two_days() {
        let start = utc(2024, 6, 1, 0, 0);
        let mut api = MockWeatherApi::new();
        api.expect_fetch()
            .withf(|_, params| {
                params.iter().any(|(k, v)| k == "start_date" && v == "2024-06-01")
                    && params.iter().any(|(k, v)| k == "end_date" && v == "2024-06-03")
            })
            .times(1)
            .returning(move |_, _| Ok(minutely_response(start)));

        let runtime = runtime_at(utc(2024, 6, 1, 9, 0));
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime);
        let points = predictor
            .predict_power_output(&site(), start.date_naive())
            .await
            .unwrap();

        assert_eq!(points.len(), 3 * 96);
        assert_eq!(points[4].date, utc(2024, 6, 1, 1, 0));
        assert_eq!(points[4].power_kw, 1.0);
    }

    #[tokio::test]
    async fn test_start_date_too_old() {
        let mut api = MockWeatherApi::new();
        api.expect_fetch().times(0);

        let runtime = runtime_at(utc(2024, 6, 1, 9, 0));
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime);
        let err = predictor
            .predict_power_output(&site(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ForecastError>(),
            Some(ForecastError::NoForecastData { .. })
        ));
    }

    // The limit is counted in calendar days: exactly 90 days back is still served.
    #[tokio::test]
    async fn test_start_date_history_boundary() {
        let now = utc(2024, 6, 1, 9, 0);
        let oldest = now.date_naive() - Days::new(MAX_HISTORY_DAYS);
        assert_eq!(oldest, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());

        let oldest_midnight = utc(2024, 3, 3, 0, 0);
        let mut api = MockWeatherApi::new();
        api.expect_fetch()
            .times(1)
            .returning(move |_, _| Ok(minutely_response(oldest_midnight)));
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime_at(now));
        assert!(predictor.predict_power_output(&site(), oldest).await.is_ok());

        let mut api = MockWeatherApi::new();
        api.expect_fetch().times(0);
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime_at(now));
        let err = predictor
            .predict_power_output(&site(), oldest - Days::new(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ForecastError>(),
            Some(ForecastError::NoForecastData { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_forecast_defaults_to_now_and_keeps_48_hours() {
        let midnight = utc(2024, 6, 1, 0, 0);
        let mut api = MockWeatherApi::new();
        api.expect_fetch()
            .returning(move |_, _| Ok(minutely_response(midnight)));

        let runtime = runtime_at(Utc.with_ymd_and_hms(2024, 6, 1, 10, 37, 12).unwrap());
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime);
        let points = predictor.run_forecast(&site(), None).await.unwrap();

        assert_eq!(points.len(), 48 * 4);
        assert_eq!(points.first().unwrap().date, utc(2024, 6, 1, 10, 30));
        assert_eq!(points.last().unwrap().date, utc(2024, 6, 3, 10, 15));
        assert_eq!(points.first().unwrap().power_kw, 10.0);
    }

    #[tokio::test]
    async fn test_run_forecast_with_explicit_start() {
        let midnight = utc(2024, 5, 20, 0, 0);
        let mut api = MockWeatherApi::new();
        api.expect_fetch()
            .withf(|_, params| params.iter().any(|(k, v)| k == "start_date" && v == "2024-05-20"))
            .returning(move |_, _| Ok(minutely_response(midnight)));

        let runtime = runtime_at(utc(2024, 6, 1, 9, 0));
        let predictor =
            SolarPowerPredictor::new(WeatherService::new(api), hour_model(), runtime);
        let points = predictor
            .run_forecast(&site(), Some(utc(2024, 5, 20, 6, 0)))
            .await
            .unwrap();

        assert_eq!(points.len(), 48 * 4);
        assert_eq!(points[0].date, utc(2024, 5, 20, 6, 0));
    }

    #[tokio::test]
    async fn test_prediction_count_mismatch() {
        let midnight = utc(2024, 6, 1, 0, 0);
        let mut api = MockWeatherApi::new();
        api.expect_fetch()
            .returning(move |_, _| Ok(minutely_response(midnight)));

        let mut model = MockRegressor::new();
        model.expect_predict().returning(|_| Ok(vec![1.0]));

        let runtime = runtime_at(utc(2024, 6, 1, 9, 0));
        let predictor = SolarPowerPredictor::new(WeatherService::new(api), model, runtime);
        assert!(
            predictor
                .predict_power_output(&site(), midnight.date_naive())
                .await
                .is_err()
        );
    }
}
