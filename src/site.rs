//! PV site description and validation.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

/// Default panel tilt in degrees from horizontal.
pub const DEFAULT_TILT: f64 = 35.0;

/// Default panel orientation in degrees clockwise from north (south-facing).
pub const DEFAULT_ORIENTATION: f64 = 180.0;

/// A photovoltaic installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvSite {
    pub latitude: f64,
    pub longitude: f64,
    /// Installed capacity in kilowatt-peak.
    pub capacity_kwp: f64,
    #[serde(default = "default_tilt")]
    pub tilt: f64,
    #[serde(default = "default_orientation")]
    pub orientation: f64,
}

fn default_tilt() -> f64 {
    DEFAULT_TILT
}

fn default_orientation() -> f64 {
    DEFAULT_ORIENTATION
}

impl PvSite {
    /// Builds a site and validates it.
    pub fn new(
        latitude: f64,
        longitude: f64,
        capacity_kwp: f64,
        tilt: Option<f64>,
        orientation: Option<f64>,
    ) -> Result<Self> {
        let site = PvSite {
            latitude,
            longitude,
            capacity_kwp,
            tilt: tilt.unwrap_or(DEFAULT_TILT),
            orientation: orientation.unwrap_or(DEFAULT_ORIENTATION),
        };
        site.validate()?;
        Ok(site)
    }

    pub fn validate(&self) -> Result<()> {
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        if !(self.capacity_kwp > 0.0) || !self.capacity_kwp.is_finite() {
            bail!(
                "Invalid capacity_kwp {}: must be greater than 0",
                self.capacity_kwp
            );
        }
        check_range("tilt", self.tilt, 0.0, 90.0)?;
        check_range("orientation", self.orientation, 0.0, 360.0)?;
        Ok(())
    }

    /// Loads and validates a site from a JSON file.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read_to_string(path)?;
        let site: PvSite = serde_json::from_str(&content)
            .with_context(|| format!("Invalid site file {}", path.display()))?;
        site.validate()?;
        Ok(site)
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    // NaN fails both comparisons
    if !(value >= min && value <= max) {
        bail!(
            "Invalid {} {}: must be between {} and {}",
            field,
            value,
            min,
            max
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_new_applies_defaults() {
        let site = PvSite::new(51.75, -1.25, 1.25, None, None).unwrap();
        assert_eq!(site.tilt, 35.0);
        assert_eq!(site.orientation, 180.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        assert!(PvSite::new(91.0, 0.0, 1.0, None, None).is_err());
        assert!(PvSite::new(0.0, -180.5, 1.0, None, None).is_err());
        assert!(PvSite::new(0.0, 0.0, 0.0, None, None).is_err());
        assert!(PvSite::new(0.0, 0.0, -2.0, None, None).is_err());
        assert!(PvSite::new(0.0, 0.0, 1.0, Some(91.0), None).is_err());
        assert!(PvSite::new(0.0, 0.0, 1.0, None, Some(361.0)).is_err());
        assert!(PvSite::new(f64::NAN, 0.0, 1.0, None, None).is_err());
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        assert!(PvSite::new(-90.0, 180.0, 0.1, Some(0.0), Some(360.0)).is_ok());
        assert!(PvSite::new(90.0, -180.0, 0.1, Some(90.0), Some(0.0)).is_ok());
    }

    #[test]
    fn test_error_message_names_field() {
        let err = PvSite::new(0.0, 0.0, 1.0, Some(120.0), None).unwrap_err();
        assert!(err.to_string().contains("tilt"));
    }

    #[test]
    fn test_load_from_json_with_defaults() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/sites/home.json");
        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(|_| Ok(r#"{"latitude": 51.75, "longitude": -1.25, "capacity_kwp": 1.25}"#.to_string()));

        let site = PvSite::load(&runtime, &path).unwrap();
        assert_eq!(site.capacity_kwp, 1.25);
        assert_eq!(site.tilt, DEFAULT_TILT);
        assert_eq!(site.orientation, DEFAULT_ORIENTATION);
    }

    #[test]
    fn test_load_rejects_invalid_site() {
        let mut runtime = MockRuntime::new();
        runtime.expect_read_to_string().returning(|_| {
            Ok(r#"{"latitude": 100, "longitude": 0, "capacity_kwp": 1}"#.to_string())
        });

        let err = PvSite::load(&runtime, Path::new("/sites/bad.json")).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }
}
