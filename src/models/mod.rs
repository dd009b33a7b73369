//! Model kinds, their parameter schemas, and the estimator seam.
//!
//! A model name is resolved once, at the facade boundary, into a [`ModelKind`]
//! that owns its typed parameters. Built-in kinds delegate to `smartcore`
//! (supervised), `linfa-clustering` (k-means) and `hdbscan`.

mod clustering;
mod registry;
mod supervised;

pub use registry::{BuiltinModel, ModelEntry, ModelRegistry};

use std::fmt;
use std::sync::Arc;

use ndarray::ArrayView2;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::dataset::{Predictions, Target};
use crate::engine::FitOptions;
use crate::error::EnginError;
use crate::task::TaskType;

/// A trained model that can score new rows.
pub trait Predictor: Send + Sync {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Predictions, String>;
}

/// Output of a successful fit: the trained model plus its predictions for the
/// training rows.
pub struct Fitted {
    pub predictor: Box<dyn Predictor>,
    pub predictions: Predictions,
}

/// Pluggable training backend, registered by name in a [`ModelRegistry`].
///
/// Errors are plain messages; the facade wraps them as
/// [`EnginError::ModelFit`].
pub trait Estimator: Send + Sync {
    fn fit(
        &self,
        task: TaskType,
        x: ArrayView2<'_, f64>,
        target: Option<&Target>,
        options: &FitOptions,
    ) -> Result<Fitted, String>;
}

/// Random forest parameters (`random_forest`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

/// Single decision tree parameters (`decision_tree`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeParams {
    pub max_depth: Option<u16>,
    pub min_samples_leaf: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSolver {
    #[default]
    Svd,
    Qr,
}

/// Ordinary least squares parameters (`linear_regression`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearParams {
    pub solver: LinearSolver,
}

/// Logistic regression parameters (`logistic_regression`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticParams {
    /// L2 regularization strength.
    pub alpha: f64,
}

/// k-means parameters (`kmeans`); the cluster count comes from
/// [`FitOptions::n_clusters`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KMeansParams {
    pub max_iterations: u64,
    pub tolerance: f64,
    pub n_runs: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
        }
    }
}

/// HDBSCAN parameters (`hdbscan`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HdbscanParams {
    pub min_cluster_size: usize,
    pub min_samples: Option<usize>,
    pub allow_single_cluster: bool,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: None,
            allow_single_cluster: false,
        }
    }
}

/// A model name resolved against a registry, carrying its typed parameters.
#[derive(Clone)]
pub enum ModelKind {
    RandomForest(ForestParams),
    DecisionTree(TreeParams),
    LinearRegression(LinearParams),
    LogisticRegression(LogisticParams),
    KMeans {
        n_clusters: usize,
        params: KMeansParams,
    },
    Hdbscan(HdbscanParams),
    Custom(Arc<dyn Estimator>),
}

impl fmt::Debug for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::RandomForest(params) => f.debug_tuple("RandomForest").field(params).finish(),
            ModelKind::DecisionTree(params) => f.debug_tuple("DecisionTree").field(params).finish(),
            ModelKind::LinearRegression(params) => {
                f.debug_tuple("LinearRegression").field(params).finish()
            }
            ModelKind::LogisticRegression(params) => {
                f.debug_tuple("LogisticRegression").field(params).finish()
            }
            ModelKind::KMeans { n_clusters, params } => f
                .debug_struct("KMeans")
                .field("n_clusters", n_clusters)
                .field("params", params)
                .finish(),
            ModelKind::Hdbscan(params) => f.debug_tuple("Hdbscan").field(params).finish(),
            ModelKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ModelKind {
    /// Resolve `options.model` for `task` against `registry`.
    pub fn resolve(
        registry: &ModelRegistry,
        task: TaskType,
        options: &FitOptions,
    ) -> Result<Self, EnginError> {
        let name = options.model();
        let entry = registry
            .get(task, name)
            .ok_or_else(|| EnginError::UnsupportedModel {
                task,
                model: name.to_string(),
                available: registry.names(task).join(", "),
            })?;
        let builtin = match entry {
            ModelEntry::Custom(estimator) => return Ok(ModelKind::Custom(Arc::clone(estimator))),
            ModelEntry::Builtin(builtin) => *builtin,
        };
        let kind = match builtin {
            BuiltinModel::RandomForest => {
                let params: ForestParams = parse_params(name, options)?;
                if params.n_trees == 0 {
                    return Err(EnginError::invalid("n_trees must be greater than zero"));
                }
                ModelKind::RandomForest(params)
            }
            BuiltinModel::DecisionTree => ModelKind::DecisionTree(parse_params(name, options)?),
            BuiltinModel::LinearRegression => {
                ModelKind::LinearRegression(parse_params(name, options)?)
            }
            BuiltinModel::LogisticRegression => {
                ModelKind::LogisticRegression(parse_params(name, options)?)
            }
            BuiltinModel::KMeans => {
                let n_clusters = options.n_clusters().ok_or_else(|| EnginError::MissingOption {
                    option: "n_clusters".to_string(),
                    model: name.to_string(),
                })?;
                if n_clusters == 0 {
                    return Err(EnginError::invalid("n_clusters must be greater than zero"));
                }
                ModelKind::KMeans {
                    n_clusters,
                    params: parse_params(name, options)?,
                }
            }
            BuiltinModel::Hdbscan => {
                if let Some(n_clusters) = options.n_clusters() {
                    tracing::debug!(
                        n_clusters,
                        "hdbscan picks its own cluster count; ignoring n_clusters"
                    );
                }
                let params: HdbscanParams = parse_params(name, options)?;
                clustering::validate_hdbscan(&params).map_err(EnginError::InvalidInput)?;
                ModelKind::Hdbscan(params)
            }
        };
        Ok(kind)
    }

    /// Train on `x` (and `target` for supervised tasks).
    pub(crate) fn fit(
        &self,
        task: TaskType,
        x: ArrayView2<'_, f64>,
        target: Option<&Target>,
        seed: u64,
        options: &FitOptions,
    ) -> Result<Fitted, String> {
        match (self, task) {
            (ModelKind::Custom(estimator), _) => estimator.fit(task, x, target, options),
            (ModelKind::KMeans { n_clusters, params }, TaskType::Clustering) => {
                clustering::fit_kmeans(x, *n_clusters, params, seed)
            }
            (ModelKind::Hdbscan(params), TaskType::Clustering) => {
                clustering::fit_hdbscan(x, params)
            }
            (_, TaskType::Regression) => {
                let y = target
                    .and_then(Target::as_continuous)
                    .ok_or_else(|| "regression needs continuous targets".to_string())?;
                supervised::fit_regressor(self, x, y.view(), seed)
            }
            (_, TaskType::Classification) => {
                let y = target
                    .and_then(Target::as_labels)
                    .ok_or_else(|| "classification needs labels".to_string())?;
                supervised::fit_classifier(self, x, y.view(), seed)
            }
            (kind, TaskType::Clustering) => Err(format!("{kind:?} cannot cluster")),
        }
    }
}

fn parse_params<T: DeserializeOwned>(model: &str, options: &FitOptions) -> Result<T, EnginError> {
    let value = serde_json::Value::Object(options.params().clone());
    serde_json::from_value(value).map_err(|err| {
        EnginError::invalid(format!("Invalid parameters for `{model}`: {err}"))
    })
}
