//! `smartcore` wrappers for the supervised model kinds.

use ndarray::{Array1, ArrayView1, ArrayView2};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters,
};
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use super::{Fitted, ForestParams, LinearSolver, ModelKind, Predictor, TreeParams};
use crate::dataset::Predictions;

type Matrix = DenseMatrix<f64>;

/// Fitted `smartcore` regressors.
enum Regressor {
    Forest(RandomForestRegressor<f64, f64, Matrix, Vec<f64>>),
    Tree(DecisionTreeRegressor<f64, f64, Matrix, Vec<f64>>),
    Linear(LinearRegression<f64, f64, Matrix, Vec<f64>>),
}

/// Fitted `smartcore` classifiers; labels travel as `i32`.
enum Classifier {
    Forest(RandomForestClassifier<f64, i32, Matrix, Vec<i32>>),
    Tree(DecisionTreeClassifier<f64, i32, Matrix, Vec<i32>>),
    Logistic(LogisticRegression<f64, i32, Matrix, Vec<i32>>),
}

pub(super) fn fit_regressor(
    kind: &ModelKind,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    seed: u64,
) -> Result<Fitted, String> {
    let matrix = to_matrix(x);
    let y = y.to_vec();
    let model = match kind {
        ModelKind::RandomForest(params) => {
            let parameters = forest_regressor_parameters(params, seed);
            RandomForestRegressor::fit(&matrix, &y, parameters).map(Regressor::Forest)
        }
        ModelKind::DecisionTree(params) => {
            let parameters = tree_regressor_parameters(params);
            DecisionTreeRegressor::fit(&matrix, &y, parameters).map(Regressor::Tree)
        }
        ModelKind::LinearRegression(params) => {
            let solver = match params.solver {
                LinearSolver::Svd => LinearRegressionSolverName::SVD,
                LinearSolver::Qr => LinearRegressionSolverName::QR,
            };
            let parameters = LinearRegressionParameters::default().with_solver(solver);
            LinearRegression::fit(&matrix, &y, parameters).map(Regressor::Linear)
        }
        other => return Err(format!("{other:?} cannot fit a regression")),
    }
    .map_err(|err| err.to_string())?;
    let predictions = model.predict_matrix(&matrix)?;
    Ok(Fitted {
        predictor: Box::new(model),
        predictions,
    })
}

pub(super) fn fit_classifier(
    kind: &ModelKind,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, usize>,
    seed: u64,
) -> Result<Fitted, String> {
    let matrix = to_matrix(x);
    let y = labels_to_i32(y)?;
    let model = match kind {
        ModelKind::RandomForest(params) => {
            let parameters = forest_classifier_parameters(params, seed);
            RandomForestClassifier::fit(&matrix, &y, parameters).map(Classifier::Forest)
        }
        ModelKind::DecisionTree(params) => {
            let parameters = tree_classifier_parameters(params);
            DecisionTreeClassifier::fit(&matrix, &y, parameters).map(Classifier::Tree)
        }
        ModelKind::LogisticRegression(params) => {
            let parameters = LogisticRegressionParameters::default().with_alpha(params.alpha);
            LogisticRegression::fit(&matrix, &y, parameters).map(Classifier::Logistic)
        }
        other => return Err(format!("{other:?} cannot fit a classification")),
    }
    .map_err(|err| err.to_string())?;
    let predictions = model.predict_matrix(&matrix)?;
    Ok(Fitted {
        predictor: Box::new(model),
        predictions,
    })
}

impl Regressor {
    fn predict_matrix(&self, matrix: &Matrix) -> Result<Predictions, String> {
        let values = match self {
            Regressor::Forest(model) => model.predict(matrix),
            Regressor::Tree(model) => model.predict(matrix),
            Regressor::Linear(model) => model.predict(matrix),
        }
        .map_err(|err| err.to_string())?;
        Ok(Predictions::Values(Array1::from(values)))
    }
}

impl Predictor for Regressor {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Predictions, String> {
        self.predict_matrix(&to_matrix(x))
    }
}

impl Classifier {
    fn predict_matrix(&self, matrix: &Matrix) -> Result<Predictions, String> {
        let labels = match self {
            Classifier::Forest(model) => model.predict(matrix),
            Classifier::Tree(model) => model.predict(matrix),
            Classifier::Logistic(model) => model.predict(matrix),
        }
        .map_err(|err| err.to_string())?;
        labels_from_i32(&labels).map(Predictions::Labels)
    }
}

impl Predictor for Classifier {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Predictions, String> {
        self.predict_matrix(&to_matrix(x))
    }
}

fn forest_regressor_parameters(
    params: &ForestParams,
    seed: u64,
) -> RandomForestRegressorParameters {
    let mut parameters = RandomForestRegressorParameters::default()
        .with_n_trees(params.n_trees as _)
        .with_min_samples_leaf(params.min_samples_leaf)
        .with_min_samples_split(params.min_samples_split)
        .with_seed(seed);
    if let Some(depth) = params.max_depth {
        parameters = parameters.with_max_depth(depth);
    }
    parameters
}

fn forest_classifier_parameters(
    params: &ForestParams,
    seed: u64,
) -> RandomForestClassifierParameters {
    let mut parameters = RandomForestClassifierParameters::default()
        .with_n_trees(params.n_trees as _)
        .with_min_samples_leaf(params.min_samples_leaf)
        .with_min_samples_split(params.min_samples_split)
        .with_seed(seed);
    if let Some(depth) = params.max_depth {
        parameters = parameters.with_max_depth(depth);
    }
    parameters
}

fn tree_regressor_parameters(params: &TreeParams) -> DecisionTreeRegressorParameters {
    let mut parameters = DecisionTreeRegressorParameters::default()
        .with_min_samples_leaf(params.min_samples_leaf)
        .with_min_samples_split(params.min_samples_split);
    if let Some(depth) = params.max_depth {
        parameters = parameters.with_max_depth(depth);
    }
    parameters
}

fn tree_classifier_parameters(params: &TreeParams) -> DecisionTreeClassifierParameters {
    let mut parameters = DecisionTreeClassifierParameters::default()
        .with_min_samples_leaf(params.min_samples_leaf)
        .with_min_samples_split(params.min_samples_split);
    if let Some(depth) = params.max_depth {
        parameters = parameters.with_max_depth(depth);
    }
    parameters
}

/// Row-major copy into a `smartcore` dense matrix.
fn to_matrix(x: ArrayView2<'_, f64>) -> Matrix {
    DenseMatrix::new(x.nrows(), x.ncols(), x.iter().copied().collect(), false)
}

fn labels_to_i32(labels: ArrayView1<'_, usize>) -> Result<Vec<i32>, String> {
    labels
        .iter()
        .map(|&label| i32::try_from(label).map_err(|_| format!("label {label} is too large")))
        .collect()
}

fn labels_from_i32(labels: &[i32]) -> Result<Array1<usize>, String> {
    labels
        .iter()
        .map(|&label| usize::try_from(label).map_err(|_| format!("model predicted label {label}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn matrix_keeps_row_major_layout() {
        use smartcore::linalg::basic::arrays::Array;

        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let matrix = to_matrix(x.view());
        assert_eq!(matrix.shape(), (2, 3));
        assert_eq!(*matrix.get((1, 0)), 4.0);
        assert_eq!(*matrix.get((0, 2)), 3.0);
    }

    #[test]
    fn label_conversion_round_trips() {
        let labels = array![0usize, 2, 1];
        let converted = labels_to_i32(labels.view()).unwrap();
        assert_eq!(converted, vec![0, 2, 1]);
        assert_eq!(labels_from_i32(&converted).unwrap(), labels);
        assert!(labels_from_i32(&[-1]).is_err());
    }

    #[test]
    fn linear_regression_recovers_exact_line() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let kind = ModelKind::LinearRegression(Default::default());
        let fitted = fit_regressor(&kind, x.view(), y.view(), 0).unwrap();
        let values = fitted.predictions.as_values().unwrap();
        for (p, t) in values.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
        let unseen = fitted.predictor.predict(array![[10.0]].view()).unwrap();
        assert!((unseen.as_values().unwrap()[0] - 21.0).abs() < 1e-6);
    }

    #[test]
    fn decision_tree_separates_two_classes() {
        let x = array![[0.0], [0.1], [0.2], [5.0], [5.1], [5.2]];
        let y = array![0usize, 0, 0, 1, 1, 1];
        let kind = ModelKind::DecisionTree(TreeParams::default());
        let fitted = fit_classifier(&kind, x.view(), y.view(), 0).unwrap();
        assert_eq!(fitted.predictions.as_labels().unwrap(), &y);
    }

    #[test]
    fn clustering_kinds_are_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let kind = ModelKind::Hdbscan(Default::default());
        assert!(fit_regressor(&kind, x.view(), y.view(), 0).is_err());
    }
}
