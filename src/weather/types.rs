use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One time section of an Open-Meteo response (`hourly` or `minutely_15`),
/// requested with `timeformat=unixtime`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub time: Vec<i64>,
    #[serde(flatten)]
    pub variables: HashMap<String, Vec<Option<f64>>>,
}

/// Open-Meteo JSON response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub hourly: Option<RawSeries>,
    #[serde(default)]
    pub minutely_15: Option<RawSeries>,
}

/// A time-indexed table of weather variables.
///
/// Columns keep the order in which the variables were requested. `None`
/// marks a value the API reported as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherFrame {
    pub dates: Vec<DateTime<Utc>>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
}

impl WeatherFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Value of `column` at `row`.
    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        self.columns
            .get(column)
            .and_then(|(_, values)| values.get(row).copied().flatten())
    }
}
