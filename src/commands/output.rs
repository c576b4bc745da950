//! Rendering of forecasts and weather frames.

use anyhow::Result;
use serde_json::{Map, Value};
use std::io::Write;

use crate::forecast::PowerPoint;
use crate::weather::WeatherFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns for reading in a terminal
    #[default]
    Table,
    Csv,
    Json,
}

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => String::new(),
    }
}

pub fn render_power<W: Write>(points: &[PowerPoint], format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Table => {
            writeln!(out, "{:<22} {:>10}", "date", "power_kw")?;
            for p in points {
                writeln!(
                    out,
                    "{:<22} {:>10.3}",
                    p.date.format(DATE_FORMAT),
                    p.power_kw
                )?;
            }
        }
        OutputFormat::Csv => {
            writeln!(out, "date,power_kw")?;
            for p in points {
                writeln!(out, "{},{}", p.date.format(DATE_FORMAT), p.power_kw)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, points)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn render_weather<W: Write>(frame: &WeatherFrame, format: OutputFormat, out: &mut W) -> Result<()> {
    let names: Vec<&str> = frame.column_names().collect();
    match format {
        OutputFormat::Table => {
            let widths: Vec<usize> = names.iter().map(|n| n.len().max(8)).collect();
            write!(out, "{:<22}", "date")?;
            for (name, width) in names.iter().zip(&widths) {
                write!(out, " {:>w$}", name, w = width)?;
            }
            writeln!(out)?;
            for (row, date) in frame.dates.iter().enumerate() {
                write!(out, "{:<22}", date.format(DATE_FORMAT))?;
                for (col, width) in widths.iter().enumerate() {
                    write!(out, " {:>w$}", format_value(frame.value(col, row)), w = width)?;
                }
                writeln!(out)?;
            }
        }
        OutputFormat::Csv => {
            writeln!(out, "date,{}", names.join(","))?;
            for (row, date) in frame.dates.iter().enumerate() {
                let values: Vec<String> = (0..names.len())
                    .map(|col| frame.value(col, row).map(|v| v.to_string()).unwrap_or_default())
                    .collect();
                writeln!(out, "{},{}", date.format(DATE_FORMAT), values.join(","))?;
            }
        }
        OutputFormat::Json => {
            let rows: Vec<Value> = frame
                .dates
                .iter()
                .enumerate()
                .map(|(row, date)| {
                    let mut obj = Map::new();
                    obj.insert("date".to_string(), Value::from(date.format(DATE_FORMAT).to_string()));
                    for (col, name) in names.iter().enumerate() {
                        let value = frame.value(col, row).map(Value::from).unwrap_or(Value::Null);
                        obj.insert(name.to_string(), value);
                    }
                    Value::Object(obj)
                })
                .collect();
            serde_json::to_writer_pretty(&mut *out, &rows)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
