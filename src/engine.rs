//! Uniform fit facade over the registered model backends.
//!
//! `Engine::fit` validates the caller's data, resolves the model name to a
//! [`ModelKind`], trains, checks the predictions and scores them with the
//! task's metric set.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use ndarray::{Array1, Array2, ArrayView2};
use serde_json::{Map, Value};

use crate::config::EngineConfig;
use crate::dataset::{self, Predictions, Target};
use crate::error::EnginError;
use crate::metrics::{self, EvalExtras, Metrics};
use crate::models::{ModelKind, ModelRegistry, Predictor};
use crate::task::TaskType;

/// Per-call fit options.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    model: String,
    n_clusters: Option<usize>,
    seed: Option<u64>,
    params: Map<String, Value>,
    ground_truth: Option<Array1<usize>>,
}

impl FitOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = Some(n_clusters);
        self
    }

    /// Overrides the configured seed for this call.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set one model parameter; keys are checked against the model's schema.
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Replace all model parameters at once.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Known cluster memberships, scored with `adjusted_rand` when clustering.
    pub fn with_ground_truth(mut self, labels: Array1<usize>) -> Self {
        self.ground_truth = Some(labels);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn n_clusters(&self) -> Option<usize> {
        self.n_clusters
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn ground_truth(&self) -> Option<&Array1<usize>> {
        self.ground_truth.as_ref()
    }
}

/// Trained model returned inside a [`FitResult`].
pub struct ModelHandle {
    name: String,
    n_features: usize,
    predictor: Box<dyn Predictor>,
}

impl ModelHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Score new rows with the trained model.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Predictions, EnginError> {
        if x.ncols() != self.n_features {
            return Err(EnginError::invalid(format!(
                "Model was trained on {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        dataset::ensure_finite(x)?;
        let predictions = self
            .predictor
            .predict(x)
            .map_err(|cause| EnginError::fit(&self.name, cause))?;
        if predictions.len() != x.nrows() {
            return Err(EnginError::fit(
                &self.name,
                format!(
                    "{} predictions returned for {} rows",
                    predictions.len(),
                    x.nrows()
                ),
            ));
        }
        Ok(predictions)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

/// Trained model, in-sample predictions and metrics from one fit.
#[derive(Debug)]
pub struct FitResult {
    task: TaskType,
    model_name: String,
    model: ModelHandle,
    predictions: Predictions,
    metrics: Metrics,
}

impl FitResult {
    pub fn task(&self) -> TaskType {
        self.task
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn predictions(&self) -> &Predictions {
        &self.predictions
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Fit facade bound to a model registry and configuration.
#[derive(Clone)]
pub struct Engine {
    registry: ModelRegistry,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ModelRegistry::builtin(), EngineConfig::default())
    }
}

impl Engine {
    pub fn new(registry: ModelRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fit_regression(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        options: &FitOptions,
    ) -> Result<FitResult, EnginError> {
        let target = Target::Continuous(y.clone());
        self.fit(TaskType::Regression, x, Some(&target), options)
    }

    pub fn fit_classification(
        &self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        options: &FitOptions,
    ) -> Result<FitResult, EnginError> {
        let target = Target::Labels(y.clone());
        self.fit(TaskType::Classification, x, Some(&target), options)
    }

    /// Ground truth, when needed, travels in [`FitOptions::with_ground_truth`].
    pub fn fit_clustering(
        &self,
        x: &Array2<f64>,
        options: &FitOptions,
    ) -> Result<FitResult, EnginError> {
        self.fit(TaskType::Clustering, x, None, options)
    }

    /// Train `options.model()` for `task` and evaluate it on the training rows.
    ///
    /// For clustering `y` may carry ground-truth labels; it takes precedence
    /// over [`FitOptions::ground_truth`].
    pub fn fit(
        &self,
        task: TaskType,
        x: &Array2<f64>,
        y: Option<&Target>,
        options: &FitOptions,
    ) -> Result<FitResult, EnginError> {
        validate_features(x)?;
        let truth = resolve_target(task, x.nrows(), y, options)?;
        let kind = ModelKind::resolve(&self.registry, task, options)?;
        if let ModelKind::KMeans { n_clusters, .. } = &kind {
            if *n_clusters > x.nrows() {
                return Err(EnginError::invalid(format!(
                    "n_clusters ({n_clusters}) exceeds the number of rows ({})",
                    x.nrows()
                )));
            }
        }
        let seed = options.seed().unwrap_or(self.config.fit.seed);
        let model_name = options.model().to_string();
        tracing::debug!(%task, model = %model_name, ?kind, seed, "Fitting model");

        let fitted = panic::catch_unwind(AssertUnwindSafe(|| {
            kind.fit(task, x.view(), truth.as_ref(), seed, options)
        }))
        .map_err(|payload| EnginError::fit(&model_name, panic_message(payload.as_ref())))?
        .map_err(|cause| EnginError::fit(&model_name, cause))?;

        check_predictions(task, &model_name, &fitted.predictions, x.nrows())?;
        let extras = EvalExtras {
            features: Some(x.view()),
        };
        let metrics = metrics::evaluate(task, truth.as_ref(), &fitted.predictions, &extras)?;
        tracing::info!(
            %task,
            model = %model_name,
            rows = x.nrows(),
            features = x.ncols(),
            "Fit complete"
        );

        Ok(FitResult {
            task,
            model_name: model_name.clone(),
            model: ModelHandle {
                name: model_name,
                n_features: x.ncols(),
                predictor: fitted.predictor,
            },
            predictions: fitted.predictions,
            metrics,
        })
    }
}

/// [`Engine::fit_regression`] on the built-in registry and default config.
pub fn fit_regression(
    x: &Array2<f64>,
    y: &Array1<f64>,
    model: &str,
    options: Option<FitOptions>,
) -> Result<FitResult, EnginError> {
    Engine::default().fit_regression(x, y, &named(model, options))
}

/// [`Engine::fit_classification`] on the built-in registry and default config.
pub fn fit_classification(
    x: &Array2<f64>,
    y: &Array1<usize>,
    model: &str,
    options: Option<FitOptions>,
) -> Result<FitResult, EnginError> {
    Engine::default().fit_classification(x, y, &named(model, options))
}

/// [`Engine::fit_clustering`] on the built-in registry and default config.
///
/// An explicit `n_clusters` overrides the one carried in `options`.
pub fn fit_clustering(
    x: &Array2<f64>,
    model: &str,
    n_clusters: Option<usize>,
    options: Option<FitOptions>,
) -> Result<FitResult, EnginError> {
    let mut options = named(model, options);
    if n_clusters.is_some() {
        options.n_clusters = n_clusters;
    }
    Engine::default().fit_clustering(x, &options)
}

fn named(model: &str, options: Option<FitOptions>) -> FitOptions {
    let mut options = options.unwrap_or_default();
    options.model = model.to_string();
    options
}

fn validate_features(x: &Array2<f64>) -> Result<(), EnginError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EnginError::invalid(format!(
            "Feature matrix is empty ({} x {})",
            x.nrows(),
            x.ncols()
        )));
    }
    dataset::ensure_finite(x.view())
}

/// The target the metrics will be scored against, checked for kind and length.
fn resolve_target(
    task: TaskType,
    n_rows: usize,
    y: Option<&Target>,
    options: &FitOptions,
) -> Result<Option<Target>, EnginError> {
    let target = match (task, y) {
        (TaskType::Clustering, Some(target)) => Some(target.clone()),
        (TaskType::Clustering, None) => options.ground_truth().cloned().map(Target::Labels),
        (_, Some(target)) => Some(target.clone()),
        (_, None) => {
            return Err(EnginError::invalid(format!("{task} requires a target vector")));
        }
    };
    let Some(target) = target else {
        return Ok(None);
    };
    let expected = match task {
        TaskType::Regression => "continuous",
        TaskType::Classification | TaskType::Clustering => "labels",
    };
    if target.kind() != expected {
        return Err(EnginError::invalid(format!(
            "{task} needs {expected} targets, got {}",
            target.kind()
        )));
    }
    dataset::ensure_target_len(&target, n_rows)?;
    Ok(Some(target))
}

fn check_predictions(
    task: TaskType,
    model: &str,
    predictions: &Predictions,
    n_rows: usize,
) -> Result<(), EnginError> {
    let kind_matches = match task {
        TaskType::Regression => predictions.as_values().is_some(),
        TaskType::Classification | TaskType::Clustering => predictions.as_labels().is_some(),
    };
    if !kind_matches {
        return Err(EnginError::fit(
            model,
            format!("returned the wrong prediction kind for {task}"),
        ));
    }
    if predictions.len() != n_rows {
        return Err(EnginError::fit(
            model,
            format!("{} predictions returned for {n_rows} rows", predictions.len()),
        ));
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
