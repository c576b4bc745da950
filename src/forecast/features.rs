//! Feature rows for the power model.

use anyhow::{Result, bail};
use chrono::{Datelike, Timelike};

use crate::model::FeatureMatrix;
use crate::site::PvSite;
use crate::weather::WeatherFrame;

/// Site columns, placed before the weather columns.
pub const PANEL_COLUMNS: &[&str] = &[
    "latitude_rounded",
    "longitude_rounded",
    "orientation",
    "tilt",
    "kwp",
];

/// Calendar columns derived from each row's timestamp, placed last.
pub const DATE_COLUMNS: &[&str] = &["year", "month", "day", "hour", "minute"];

/// One row per weather timestamp: panel columns, then weather columns in frame
/// order, then the timestamp's year, month, day, hour and minute (UTC).
pub fn build_features(site: &PvSite, frame: &WeatherFrame) -> Result<FeatureMatrix> {
    if let Some(clash) = frame
        .column_names()
        .find(|n| PANEL_COLUMNS.iter().chain(DATE_COLUMNS).any(|d| d == n))
    {
        bail!("Weather column '{}' clashes with a derived feature", clash);
    }

    let names: Vec<String> = PANEL_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(frame.column_names().map(str::to_string))
        .chain(DATE_COLUMNS.iter().map(|c| c.to_string()))
        .collect();

    let panel = [
        site.latitude,
        site.longitude,
        site.orientation,
        site.tilt,
        site.capacity_kwp,
    ];

    let mut matrix = FeatureMatrix::new(names);
    for (row_idx, date) in frame.dates.iter().enumerate() {
        let mut row: Vec<Option<f64>> = Vec::with_capacity(matrix.n_cols());
        row.extend(panel.iter().map(|&v| Some(v)));
        row.extend((0..frame.columns.len()).map(|col| frame.value(col, row_idx)));
        row.extend(
            [
                date.year() as f64,
                date.month() as f64,
                date.day() as f64,
                date.hour() as f64,
                date.minute() as f64,
            ]
            .map(Some),
        );
        matrix.push_row(row)?;
    }

    Ok(matrix)
}
