use anyhow::{Result, bail};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::output::{OutputFormat, render_power};
use crate::config::Config;
use crate::forecast::{SolarPowerPredictor, parse_timestamp};
use crate::model::XgbModel;
use crate::runtime::Runtime;
use crate::site::PvSite;

/// Where the site comes from: a JSON file or individual values.
#[derive(Debug, Clone, Default)]
pub struct SiteArgs {
    pub file: Option<PathBuf>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity_kwp: Option<f64>,
    pub tilt: Option<f64>,
    pub orientation: Option<f64>,
}

pub fn resolve_site<R: Runtime>(runtime: &R, args: &SiteArgs) -> Result<PvSite> {
    if let Some(path) = &args.file {
        return PvSite::load(runtime, path);
    }
    match (args.latitude, args.longitude, args.capacity_kwp) {
        (Some(lat), Some(lon), Some(kwp)) => PvSite::new(lat, lon, kwp, args.tilt, args.orientation),
        _ => bail!("Provide --site FILE, or --lat, --lon and --capacity-kwp"),
    }
}

/// Runs the 48 hour power forecast and writes it to `out`.
#[tracing::instrument(skip(config, out))]
pub async fn forecast<R: Runtime + 'static, W: Write>(
    config: &Config<R>,
    site: &PvSite,
    model_path: &Path,
    start: Option<&str>,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let ts = start.map(parse_timestamp).transpose()?;
    let model = XgbModel::load(config.runtime.as_ref(), model_path)?;
    debug!("Model has {} trees", model.num_trees());

    let predictor = SolarPowerPredictor::new(config.weather_service(), model, config.runtime.clone());
    let points = predictor.run_forecast(site, ts).await?;

    render_power(&points, format, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_resolve_site_from_values() {
        let runtime = MockRuntime::new();
        let args = SiteArgs {
            latitude: Some(51.75),
            longitude: Some(-1.25),
            capacity_kwp: Some(1.25),
            tilt: Some(20.0),
            ..Default::default()
        };
        let site = resolve_site(&runtime, &args).unwrap();
        assert_eq!(site.tilt, 20.0);
        assert_eq!(site.orientation, 180.0);
    }

    #[test]
    fn test_resolve_site_requires_all_values() {
        let runtime = MockRuntime::new();
        let args = SiteArgs {
            latitude: Some(51.75),
            longitude: Some(-1.25),
            ..Default::default()
        };
        let err = resolve_site(&runtime, &args).unwrap_err();
        assert!(err.to_string().contains("--capacity-kwp"));
    }

    #[test]
    fn test_resolve_site_file_wins() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/sites/roof.json");
        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(|_| Ok(r#"{"latitude": 10, "longitude": 20, "capacity_kwp": 4}"#.to_string()));

        let args = SiteArgs {
            file: Some(path),
            latitude: Some(0.0),
            ..Default::default()
        };
        let site = resolve_site(&runtime, &args).unwrap();
        assert_eq!(site.latitude, 10.0);
        assert_eq!(site.capacity_kwp, 4.0);
    }
}
