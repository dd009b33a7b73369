//! In-memory tabular data handed to the pipeline by callers.

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::EnginError;

/// Target column for supervised tasks, or ground truth for clustering.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Real-valued regression targets.
    Continuous(Array1<f64>),
    /// Class labels or ground-truth cluster ids.
    Labels(Array1<usize>),
}

impl Target {
    pub fn len(&self) -> usize {
        match self {
            Target::Continuous(values) => values.len(),
            Target::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Continuous(_) => "continuous",
            Target::Labels(_) => "labels",
        }
    }

    pub fn as_continuous(&self) -> Option<&Array1<f64>> {
        match self {
            Target::Continuous(values) => Some(values),
            Target::Labels(_) => None,
        }
    }

    pub fn as_labels(&self) -> Option<&Array1<usize>> {
        match self {
            Target::Labels(labels) => Some(labels),
            Target::Continuous(_) => None,
        }
    }
}

impl From<Array1<f64>> for Target {
    fn from(values: Array1<f64>) -> Self {
        Target::Continuous(values)
    }
}

impl From<Array1<usize>> for Target {
    fn from(labels: Array1<usize>) -> Self {
        Target::Labels(labels)
    }
}

/// Model output, one entry per input row.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// Regression estimates.
    Values(Array1<f64>),
    /// Predicted class labels or assigned cluster ids.
    Labels(Array1<usize>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Values(values) => values.len(),
            Predictions::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_values(&self) -> Option<&Array1<f64>> {
        match self {
            Predictions::Values(values) => Some(values),
            Predictions::Labels(_) => None,
        }
    }

    pub fn as_labels(&self) -> Option<&Array1<usize>> {
        match self {
            Predictions::Labels(labels) => Some(labels),
            Predictions::Values(_) => None,
        }
    }
}

/// Feature matrix with named columns and an optional target.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    target: Option<Target>,
    feature_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset, checking names, target length and finiteness.
    pub fn new(
        features: Array2<f64>,
        target: Option<Target>,
        feature_names: Vec<String>,
    ) -> Result<Self, EnginError> {
        ensure_feature_names(&feature_names, features.ncols())?;
        ensure_finite(features.view())?;
        if let Some(target) = &target {
            ensure_target_len(target, features.nrows())?;
        }
        Ok(Self {
            features,
            target,
            feature_names,
        })
    }

    pub(crate) fn from_generated(
        features: Array2<f64>,
        target: Target,
        feature_names: Vec<String>,
    ) -> Self {
        debug_assert_eq!(features.ncols(), feature_names.len());
        debug_assert_eq!(features.nrows(), target.len());
        Self {
            features,
            target: Some(target),
            feature_names,
        }
    }

    /// Build a dataset without a target, naming columns `feature_<i>`.
    pub fn unlabeled(features: Array2<f64>) -> Result<Self, EnginError> {
        let names = default_feature_names(features.ncols());
        Self::new(features, None, names)
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn into_parts(self) -> (Array2<f64>, Option<Target>, Vec<String>) {
        (self.features, self.target, self.feature_names)
    }
}

/// Per-column descriptive statistics shown in reports.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    pub name: String,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize every column of `features`; `names` must match the column count.
pub fn summarize_features(features: ArrayView2<'_, f64>, names: &[String]) -> Vec<FeatureSummary> {
    features
        .columns()
        .into_iter()
        .zip(names)
        .map(|(column, name)| {
            let n = column.len().max(1) as f64;
            let mean = column.sum() / n;
            let variance = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let (min, max) = column
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            FeatureSummary {
                name: name.clone(),
                mean,
                std: variance.sqrt(),
                min: if column.is_empty() { 0.0 } else { min },
                max: if column.is_empty() { 0.0 } else { max },
            }
        })
        .collect()
}

pub fn default_feature_names(n_features: usize) -> Vec<String> {
    (0..n_features).map(|idx| format!("feature_{idx}")).collect()
}

pub(crate) fn ensure_feature_names(names: &[String], n_features: usize) -> Result<(), EnginError> {
    if names.len() != n_features {
        return Err(EnginError::invalid(format!(
            "{} feature names supplied for {n_features} columns",
            names.len()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_target_len(target: &Target, n_rows: usize) -> Result<(), EnginError> {
    if target.len() != n_rows {
        return Err(EnginError::invalid(format!(
            "Target has {} values but the feature matrix has {n_rows} rows",
            target.len()
        )));
    }
    if let Target::Continuous(values) = target {
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(EnginError::invalid(format!(
                "Non-finite target value at row {idx}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn ensure_finite(features: ArrayView2<'_, f64>) -> Result<(), EnginError> {
    for ((row, col), value) in features.indexed_iter() {
        if !value.is_finite() {
            return Err(EnginError::invalid(format!(
                "Non-finite feature value at row {row}, column {col}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_name_count_mismatch() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let err = Dataset::new(x, None, vec!["a".into()]).unwrap_err();
        assert!(matches!(err, EnginError::InvalidInput(_)));
    }

    #[test]
    fn rejects_short_target() {
        let x = array![[1.0], [2.0], [3.0]];
        let target = Target::Continuous(array![1.0, 2.0]);
        let err = Dataset::new(x, Some(target), vec!["a".into()]).unwrap_err();
        assert!(err.to_string().contains("2 values"));
    }

    #[test]
    fn rejects_nan_features() {
        let x = array![[1.0, f64::NAN]];
        let err = Dataset::unlabeled(x).unwrap_err();
        assert!(err.to_string().contains("row 0, column 1"));
    }

    #[test]
    fn summary_uses_population_std() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let names = default_feature_names(2);
        let summary = summarize_features(x.view(), &names);
        assert_eq!(summary[0].mean, 2.0);
        assert_eq!(summary[0].std, 1.0);
        assert_eq!(summary[0].min, 1.0);
        assert_eq!(summary[0].max, 3.0);
        assert_eq!(summary[1].std, 0.0);
        assert_eq!(summary[1].name, "feature_1");
    }
}
