//! Seeded synthetic datasets for demos, tests and benchmarks.
//!
//! Every generator is deterministic for a given seed.

use std::f64::consts::PI;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::{Dataset, Target, default_feature_names};

/// Column names of the Iris measurements.
pub const IRIS_FEATURE_NAMES: [&str; 4] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

/// Per-class `(mean, std)` of the Iris measurements, setosa/versicolor/virginica.
const IRIS_CLASS_STATS: [[(f64, f64); 4]; 3] = [
    [(5.006, 0.352), (3.428, 0.379), (1.462, 0.174), (0.246, 0.105)],
    [(5.936, 0.516), (2.770, 0.314), (4.260, 0.470), (1.326, 0.198)],
    [(6.588, 0.636), (2.974, 0.322), (5.552, 0.552), (2.026, 0.275)],
];

const IRIS_ROWS_PER_CLASS: usize = 50;
const CENTER_BOX: (f64, f64) = (-10.0, 10.0);
const CENTER_ATTEMPTS: usize = 1_000;

/// Uniform `[0, 1)` features with `y = 5 x0 + 3 x1 - 2 x2 + noise * N(0, 1)`.
///
/// Columns beyond the third are uninformative. Fewer than three features use
/// only the available coefficients.
pub fn linear_regression(n_rows: usize, n_features: usize, noise: f64, seed: u64) -> Dataset {
    const COEFFICIENTS: [f64; 3] = [5.0, 3.0, -2.0];
    let mut rng = StdRng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.random::<f64>());
    let y: Array1<f64> = x
        .rows()
        .into_iter()
        .map(|row| {
            let signal: f64 = row
                .iter()
                .zip(COEFFICIENTS)
                .map(|(value, coef)| value * coef)
                .sum();
            signal + noise * standard_normal(&mut rng)
        })
        .collect();
    build(x, Target::Continuous(y), default_feature_names(n_features))
}

/// Isotropic Gaussian blobs with ground-truth labels.
///
/// Centres are drawn uniformly from `[-10, 10)` per dimension and resampled
/// until every pair sits at least `6 * cluster_std` apart, so the blobs stay
/// separable. Samples are spread round-robin across centres.
pub fn blobs(
    n_samples: usize,
    centers: usize,
    cluster_std: f64,
    n_features: usize,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let centres = draw_centres(&mut rng, centers.max(1), n_features, 6.0 * cluster_std);
    let mut x = Array2::zeros((n_samples, n_features));
    let mut labels = Array1::zeros(n_samples);
    for (row_idx, mut row) in x.rows_mut().into_iter().enumerate() {
        let label = row_idx % centres.len();
        labels[row_idx] = label;
        for (value, centre) in row.iter_mut().zip(&centres[label]) {
            *value = centre + cluster_std * standard_normal(&mut rng);
        }
    }
    build(x, Target::Labels(labels), default_feature_names(n_features))
}

/// 150 rows, 4 features and 3 balanced classes shaped like the Iris dataset.
pub fn iris_like(seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_rows = IRIS_ROWS_PER_CLASS * IRIS_CLASS_STATS.len();
    let mut x = Array2::zeros((n_rows, IRIS_FEATURE_NAMES.len()));
    let mut labels = Array1::zeros(n_rows);
    for (row_idx, mut row) in x.rows_mut().into_iter().enumerate() {
        let class = row_idx / IRIS_ROWS_PER_CLASS;
        labels[row_idx] = class;
        for (value, (mean, std)) in row.iter_mut().zip(IRIS_CLASS_STATS[class]) {
            *value = (mean + std * standard_normal(&mut rng)).max(0.1);
        }
    }
    let names = IRIS_FEATURE_NAMES.iter().map(|name| name.to_string()).collect();
    build(x, Target::Labels(labels), names)
}

fn draw_centres(rng: &mut StdRng, count: usize, n_features: usize, min_gap: f64) -> Vec<Vec<f64>> {
    let mut centres: Vec<Vec<f64>> = Vec::with_capacity(count);
    let mut attempts = 0usize;
    while centres.len() < count {
        let candidate: Vec<f64> = (0..n_features)
            .map(|_| rng.random_range(CENTER_BOX.0..CENTER_BOX.1))
            .collect();
        attempts += 1;
        let far_enough = centres
            .iter()
            .all(|centre| euclidean(centre, &candidate) >= min_gap);
        // Give up on spacing rather than loop forever on crowded settings.
        if far_enough || attempts > CENTER_ATTEMPTS {
            centres.push(candidate);
        }
    }
    centres
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Box-Muller draw from `N(0, 1)`.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn build(x: Array2<f64>, target: Target, names: Vec<String>) -> Dataset {
    // Generated values are finite and shapes line up by construction.
    Dataset::from_generated(x, target, names)
}
