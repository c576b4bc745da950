//! Inference for gradient-boosted tree ensembles saved with XGBoost's
//! `save_model("model.json")`.

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use serde::Deserialize;
use std::path::Path;

use super::{FeatureMatrix, Regressor};
use crate::runtime::Runtime;

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    learner_model_param: LearnerModelParam,
    objective: Objective,
    gradient_booster: GradientBooster,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<TreeEnsemble>,
}

#[derive(Debug, Deserialize)]
struct TreeEnsemble {
    trees: Vec<RawTree>,
}

/// JSON encodes booleans as 0/1 in recent versions and as true/false in older ones.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// A validated tree in flat array form. Node 0 is the root.
#[derive(Debug, Clone)]
struct Tree {
    left: Vec<i32>,
    right: Vec<i32>,
    feature: Vec<usize>,
    // Split threshold for inner nodes, leaf value for leaves.
    value: Vec<f32>,
    default_left: Vec<bool>,
}

impl Tree {
    fn from_raw(raw: RawTree, index: usize, num_feature: usize) -> Result<Self> {
        let n = raw.left_children.len();
        if n == 0 {
            bail!("Tree {} has no nodes", index);
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            bail!("Tree {} has node arrays of different lengths", index);
        }
        if raw.split_type.iter().any(|&t| t != 0) {
            bail!("Tree {} uses categorical splits, which are not supported", index);
        }

        for i in 0..n {
            let (l, r) = (raw.left_children[i], raw.right_children[i]);
            if l == -1 {
                continue;
            }
            let in_range = |c: i32| c > i as i32 && (c as usize) < n;
            if !in_range(l) || !in_range(r) {
                bail!("Tree {} node {} has invalid children ({}, {})", index, i, l, r);
            }
            if raw.split_indices[i] >= num_feature {
                bail!(
                    "Tree {} node {} splits on feature {} but the model has {} features",
                    index,
                    i,
                    raw.split_indices[i],
                    num_feature
                );
            }
        }

        Ok(Tree {
            left: raw.left_children,
            right: raw.right_children,
            feature: raw.split_indices,
            value: raw.split_conditions,
            default_left: raw.default_left.into_iter().map(Flag::is_set).collect(),
        })
    }

    fn leaf_value(&self, row: &[Option<f64>]) -> f32 {
        let mut node = 0usize;
        loop {
            let left = self.left[node];
            if left == -1 {
                return self.value[node];
            }
            // Splits are evaluated in single precision, as XGBoost does.
            let go_left = match row[self.feature[node]] {
                Some(v) if !v.is_nan() => (v as f32) < self.value[node],
                _ => self.default_left[node],
            };
            node = if go_left { left } else { self.right[node] } as usize;
        }
    }
}

/// How the summed margin maps to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Identity,
    Logistic,
    Log,
}

impl Link {
    fn for_objective(name: &str) -> Result<Self> {
        match name {
            "reg:squarederror" | "reg:linear" | "reg:squaredlogerror" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:quantileerror" => Ok(Link::Identity),
            "reg:logistic" | "binary:logistic" => Ok(Link::Logistic),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(Link::Log),
            other => bail!("Unsupported objective '{}'", other),
        }
    }

    fn margin_of(self, base_score: f64) -> f64 {
        match self {
            Link::Identity => base_score,
            Link::Logistic => (base_score / (1.0 - base_score)).ln(),
            Link::Log => base_score.ln(),
        }
    }

    fn transform(self, margin: f64) -> f64 {
        match self {
            Link::Identity => margin,
            Link::Logistic => 1.0 / (1.0 + (-margin).exp()),
            Link::Log => margin.exp(),
        }
    }
}

/// A loaded XGBoost tree ensemble.
#[derive(Debug, Clone)]
pub struct XgbModel {
    feature_names: Vec<String>,
    num_feature: usize,
    base_margin: f64,
    link: Link,
    trees: Vec<Tree>,
}

impl XgbModel {
    /// Loads a model file. Only XGBoost's JSON format is accepted.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            bail!("Model path must be provided");
        }
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            bail!(
                "Model file must be an XGBoost JSON model (*.json), got {}",
                path.display()
            );
        }

        let content = runtime.read_to_string(path)?;
        let model = Self::from_json(&content)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;
        debug!(
            "Loaded model with {} trees and {} features from {:?}",
            model.trees.len(),
            model.num_feature,
            path
        );
        Ok(model)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: ModelFile =
            serde_json::from_str(content).context("Not a valid XGBoost JSON model")?;
        let learner = file.learner;

        if learner.gradient_booster.name != "gbtree" {
            bail!(
                "Unsupported booster '{}', only gbtree is supported",
                learner.gradient_booster.name
            );
        }
        let ensemble = learner
            .gradient_booster
            .model
            .ok_or_else(|| anyhow!("Model has no trees"))?;

        let num_feature = match &learner.learner_model_param.num_feature {
            Some(n) => n
                .parse::<usize>()
                .with_context(|| format!("Invalid num_feature '{}'", n))?,
            None => learner.feature_names.len(),
        };
        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_feature {
            bail!(
                "Model declares {} feature names but {} features",
                learner.feature_names.len(),
                num_feature
            );
        }

        let link = Link::for_objective(&learner.objective.name)?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;

        let trees = ensemble
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, i, num_feature))
            .collect::<Result<Vec<_>>>()?;

        Ok(XgbModel {
            feature_names: learner.feature_names,
            num_feature,
            base_margin: link.margin_of(base_score),
            link,
            trees,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn check_features(&self, features: &FeatureMatrix) -> Result<()> {
        if features.n_cols() != self.num_feature {
            bail!(
                "Model expects {} features, got {}",
                self.num_feature,
                features.n_cols()
            );
        }
        if let Some((i, (expected, got))) = self
            .feature_names
            .iter()
            .zip(features.names())
            .enumerate()
            .find(|(_, (e, g))| e != g)
        {
            bail!(
                "Feature {} mismatch: model expects '{}', got '{}'",
                i,
                expected,
                got
            );
        }
        Ok(())
    }
}

impl Regressor for XgbModel {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_features(features)?;
        Ok(features
            .rows()
            .iter()
            .map(|row| {
                let sum: f64 = self.trees.iter().map(|t| t.leaf_value(row) as f64).sum();
                self.link.transform(self.base_margin + sum)
            })
            .collect())
    }
}

/// Accepts both `"5E-1"` and the bracketed `"[5E-1]"` written by newer releases.
fn parse_base_score(value: &str) -> Result<f64> {
    let trimmed = value.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or("").trim();
    first
        .parse::<f64>()
        .with_context(|| format!("Invalid base_score '{}'", value))
}
