use std::collections::BTreeMap;
use std::sync::Arc;

use super::Estimator;
use crate::error::EnginError;
use crate::task::TaskType;

/// Models shipped with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinModel {
    RandomForest,
    DecisionTree,
    LinearRegression,
    LogisticRegression,
    KMeans,
    Hdbscan,
}

impl BuiltinModel {
    pub fn supports(self, task: TaskType) -> bool {
        match self {
            BuiltinModel::RandomForest | BuiltinModel::DecisionTree => task.is_supervised(),
            BuiltinModel::LinearRegression => task == TaskType::Regression,
            BuiltinModel::LogisticRegression => task == TaskType::Classification,
            BuiltinModel::KMeans | BuiltinModel::Hdbscan => task == TaskType::Clustering,
        }
    }
}

/// What a registered name points at.
#[derive(Clone)]
pub enum ModelEntry {
    Builtin(BuiltinModel),
    Custom(Arc<dyn Estimator>),
}

/// Explicit `(task, name) -> model` table handed to the engine.
///
/// Names are matched case-insensitively with `-` and `_` treated alike.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    entries: BTreeMap<(TaskType, String), ModelEntry>,
}

impl ModelRegistry {
    /// A registry with no models at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The stock model table.
    pub fn builtin() -> Self {
        use BuiltinModel::*;
        const TABLE: &[(TaskType, &str, BuiltinModel)] = &[
            (TaskType::Regression, "random_forest", RandomForest),
            (TaskType::Regression, "decision_tree", DecisionTree),
            (TaskType::Regression, "linear_regression", LinearRegression),
            (TaskType::Regression, "linear", LinearRegression),
            (TaskType::Classification, "random_forest", RandomForest),
            (TaskType::Classification, "decision_tree", DecisionTree),
            (TaskType::Classification, "logistic_regression", LogisticRegression),
            (TaskType::Classification, "logistic", LogisticRegression),
            (TaskType::Clustering, "kmeans", KMeans),
            (TaskType::Clustering, "hdbscan", Hdbscan),
        ];
        let mut registry = Self::empty();
        for &(task, name, model) in TABLE {
            registry
                .entries
                .insert((task, normalize_name(name)), ModelEntry::Builtin(model));
        }
        registry
    }

    /// Register (or replace) a built-in model under `name`.
    pub fn register_builtin(
        &mut self,
        task: TaskType,
        name: &str,
        model: BuiltinModel,
    ) -> Result<(), EnginError> {
        if !model.supports(task) {
            return Err(EnginError::invalid(format!(
                "{model:?} cannot be registered for {task}"
            )));
        }
        self.entries
            .insert((task, normalize_name(name)), ModelEntry::Builtin(model));
        Ok(())
    }

    /// Register (or replace) a custom estimator under `name`.
    pub fn register<E: Estimator + 'static>(&mut self, task: TaskType, name: &str, estimator: E) {
        self.entries.insert(
            (task, normalize_name(name)),
            ModelEntry::Custom(Arc::new(estimator)),
        );
    }

    pub fn get(&self, task: TaskType, name: &str) -> Option<&ModelEntry> {
        self.entries.get(&(task, normalize_name(name)))
    }

    /// Registered names for `task`, sorted.
    pub fn names(&self, task: TaskType) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(entry_task, _)| *entry_task == task)
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}
