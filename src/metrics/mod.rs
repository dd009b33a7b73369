//! Named scalar metrics for regression, classification and clustering.
//!
//! The metric set is fixed per task type:
//! - regression: `mse`, `rmse`, `mae`, `r2`
//! - classification: `accuracy`, `precision`, `recall`, `f1` (macro-averaged)
//! - clustering: `silhouette`, plus `adjusted_rand` when ground truth is supplied
//!
//! All formulas are the conventional closed forms; nothing here is randomized.

mod classification;
mod clustering;
mod regression;

pub use classification::{
    ConfusionMatrix, PerClassStats, accuracy, classification_metrics, precision_recall_by_class,
};
pub use clustering::{adjusted_rand_index, cluster_sizes, clustering_metrics, silhouette_score};
pub use regression::regression_metrics;

use std::ops::Index;

use ndarray::ArrayView2;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::dataset::{Predictions, Target};
use crate::error::EnginError;
use crate::task::TaskType;

pub const REGRESSION_METRICS: [&str; 4] = ["mse", "rmse", "mae", "r2"];
pub const CLASSIFICATION_METRICS: [&str; 4] = ["accuracy", "precision", "recall", "f1"];
pub const SILHOUETTE: &str = "silhouette";
pub const ADJUSTED_RAND: &str = "adjusted_rand";

/// Metric name to value, iterated in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    pub(crate) fn push(&mut self, name: &str, value: f64) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<&str> for Metrics {
    type Output = f64;

    /// Panics when the metric is absent, like `HashMap` indexing.
    fn index(&self, name: &str) -> &f64 {
        match self.entries.iter().find(|(entry, _)| entry == name) {
            Some((_, value)) => value,
            None => panic!("no metric named `{name}`"),
        }
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Additional inputs some task types need.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalExtras<'a> {
    /// Feature matrix, required for clustering (silhouette distances).
    pub features: Option<ArrayView2<'a, f64>>,
}

/// Evaluate the fixed metric set for `task`.
///
/// For clustering, `y_true` is optional ground truth; for supervised tasks it
/// is required and must match the task's target kind.
pub fn evaluate(
    task: TaskType,
    y_true: Option<&Target>,
    y_pred: &Predictions,
    extra: &EvalExtras<'_>,
) -> Result<Metrics, EnginError> {
    match task {
        TaskType::Regression => {
            let truth = y_true
                .and_then(Target::as_continuous)
                .ok_or_else(|| EnginError::invalid("Regression metrics need continuous targets"))?;
            let predicted = y_pred
                .as_values()
                .ok_or_else(|| EnginError::invalid("Regression metrics need numeric predictions"))?;
            regression_metrics(truth.view(), predicted.view())
        }
        TaskType::Classification => {
            let truth = y_true
                .and_then(Target::as_labels)
                .ok_or_else(|| EnginError::invalid("Classification metrics need true labels"))?;
            let predicted = y_pred.as_labels().ok_or_else(|| {
                EnginError::invalid("Classification metrics need predicted labels")
            })?;
            classification_metrics(truth.view(), predicted.view())
        }
        TaskType::Clustering => {
            let features = extra
                .features
                .ok_or_else(|| EnginError::invalid("Clustering metrics need the feature matrix"))?;
            let labels = y_pred
                .as_labels()
                .ok_or_else(|| EnginError::invalid("Clustering metrics need cluster labels"))?;
            let truth = match y_true {
                Some(target) => Some(target.as_labels().ok_or_else(|| {
                    EnginError::invalid("Clustering ground truth must be labels")
                })?),
                None => None,
            };
            clustering_metrics(features, labels.view(), truth.map(|t| t.view()))
        }
    }
}
