//! Error taxonomy shared by fitting, evaluation and reporting.

use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskType;

/// Failures surfaced by the fit/evaluate/report pipeline.
///
/// Every variant names the violated precondition; nothing is logged and
/// swallowed internally.
#[derive(Debug, Error)]
pub enum EnginError {
    /// Shape, length or value problems with caller-supplied data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The model name is not registered for the task.
    #[error("Unsupported model `{model}` for {task} (available: {available})")]
    UnsupportedModel {
        task: TaskType,
        model: String,
        available: String,
    },
    /// A model needs an option that was not supplied.
    #[error("Model `{model}` requires option `{option}`")]
    MissingOption { option: String, model: String },
    /// The metric is mathematically undefined for the given input.
    #[error("Metric `{metric}` is undefined: {reason}")]
    UndefinedMetric { metric: String, reason: String },
    /// The underlying estimator failed or panicked.
    #[error("Fitting `{model}` failed: {cause}")]
    ModelFit { model: String, cause: String },
    /// Writing the report failed.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EnginError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn undefined(metric: &str, reason: impl Into<String>) -> Self {
        Self::UndefinedMetric {
            metric: metric.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn fit(model: &str, cause: impl Into<String>) -> Self {
        Self::ModelFit {
            model: model.to_string(),
            cause: cause.into(),
        }
    }
}
