//! Power models and where to get them.
//!
//! - `xgboost` - Gradient-boosted tree ensembles in XGBoost's JSON format
//! - `hub` - Downloading model files from a model hub into the local cache

mod hub;
mod xgboost;

use anyhow::{Result, bail};

pub use hub::{HUB_URL, HubRepo, ModelHub};
pub use xgboost::XgbModel;

/// Named feature columns and row-major values. `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<f64>>) -> Result<()> {
        if row.len() != self.names.len() {
            bail!(
                "Feature row has {} values, expected {}",
                row.len(),
                self.names.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// A model that maps each feature row to one value.
#[cfg_attr(test, mockall::automock)]
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_checks_width() {
        let mut m = FeatureMatrix::new(vec!["a".to_string(), "b".to_string()]);
        assert!(m.push_row(vec![Some(1.0), None]).is_ok());
        assert!(m.push_row(vec![Some(1.0)]).is_err());
        assert_eq!(m.n_rows(), 1);
        assert_eq!(m.n_cols(), 2);
        assert_eq!(m.column_index("b"), Some(1));
    }
}
