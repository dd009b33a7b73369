//! k-means (`linfa-clustering`) and HDBSCAN (`hdbscan`) backends.
//!
//! Both hand back a [`NearestCentroid`] predictor so new rows are assigned the
//! same way regardless of the algorithm that found the clusters.

use std::collections::HashMap;

use hdbscan::{Hdbscan, HdbscanHyperParams};
use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand_08::SeedableRng;
use rand_08::rngs::StdRng;

use super::{Fitted, HdbscanParams, KMeansParams, Predictor};
use crate::dataset::Predictions;

pub(super) fn fit_kmeans(
    x: ArrayView2<'_, f64>,
    n_clusters: usize,
    params: &KMeansParams,
    seed: u64,
) -> Result<Fitted, String> {
    if x.nrows() < n_clusters {
        return Err(format!(
            "{n_clusters} clusters requested for {} rows",
            x.nrows()
        ));
    }
    let dataset = DatasetBase::from(x.to_owned());
    let model = KMeans::params_with_rng(n_clusters, StdRng::seed_from_u64(seed))
        .max_n_iterations(params.max_iterations)
        .tolerance(params.tolerance)
        .n_runs(params.n_runs)
        .fit(&dataset)
        .map_err(|err| format!("k-means failed: {err}"))?;
    let predictor = NearestCentroid::new(model.centroids().to_owned());
    let labels = predictor.assign(x);
    Ok(Fitted {
        predictor: Box::new(predictor),
        predictions: Predictions::Labels(labels),
    })
}

pub(crate) fn validate_hdbscan(params: &HdbscanParams) -> Result<(), String> {
    if params.min_cluster_size < 2 {
        return Err("min_cluster_size must be at least 2".to_string());
    }
    if params.min_samples == Some(0) {
        return Err("min_samples must be greater than zero".to_string());
    }
    Ok(())
}

/// Density clustering. Noise points are folded into the nearest cluster and
/// ids are renumbered by first appearance, so every row gets a label.
pub(super) fn fit_hdbscan(
    x: ArrayView2<'_, f64>,
    params: &HdbscanParams,
) -> Result<Fitted, String> {
    validate_hdbscan(params)?;
    if x.nrows() == 0 {
        return Err("No data points found for clustering".to_string());
    }
    let data: Vec<Vec<f32>> = x
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&v| v as f32).collect())
        .collect();
    let mut labels = run_hdbscan(&data, params)?;
    let noise = labels.iter().filter(|&&label| label < 0).count();
    assign_noise_to_nearest(&data, &mut labels);
    remap_first_seen(&mut labels);
    tracing::debug!(rows = data.len(), noise, "hdbscan finished");

    let labels: Array1<usize> = labels.iter().map(|&label| label as usize).collect();
    let predictor = NearestCentroid::from_labels(x, labels.view());
    Ok(Fitted {
        predictor: Box::new(predictor),
        predictions: Predictions::Labels(labels),
    })
}

fn run_hdbscan(data: &[Vec<f32>], params: &HdbscanParams) -> Result<Vec<i32>, String> {
    let min_required = params
        .min_samples
        .unwrap_or(1)
        .max(params.min_cluster_size)
        .max(2);
    if data.len() < min_required {
        // The clusterer panics below its minimum size; call it one cluster.
        return Ok(vec![0; data.len()]);
    }
    let mut builder = HdbscanHyperParams::builder().min_cluster_size(params.min_cluster_size);
    if let Some(min_samples) = params.min_samples {
        builder = builder.min_samples(min_samples);
    }
    if params.allow_single_cluster {
        builder = builder.allow_single_cluster(true);
    }
    Hdbscan::new(data, builder.build())
        .cluster()
        .map_err(|err| format!("HDBSCAN clustering failed: {err}"))
}

fn assign_noise_to_nearest(data: &[Vec<f32>], labels: &mut [i32]) {
    if labels.iter().all(|&label| label >= 0) {
        return;
    }
    let mut sums: HashMap<i32, (Vec<f32>, usize)> = HashMap::new();
    for (point, &label) in data.iter().zip(labels.iter()) {
        if label < 0 {
            continue;
        }
        let entry = sums
            .entry(label)
            .or_insert_with(|| (vec![0.0; point.len()], 0));
        for (sum, value) in entry.0.iter_mut().zip(point) {
            *sum += *value;
        }
        entry.1 += 1;
    }
    if sums.is_empty() {
        labels.fill(0);
        return;
    }
    let mut centroids: Vec<(i32, Vec<f32>)> = sums
        .into_iter()
        .map(|(label, (mut sum, count))| {
            let denom = count as f32;
            sum.iter_mut().for_each(|value| *value /= denom);
            (label, sum)
        })
        .collect();
    // HashMap order is random; ties must not depend on it.
    centroids.sort_by_key(|(label, _)| *label);
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        if *label >= 0 {
            continue;
        }
        let mut best: Option<(i32, f32)> = None;
        for (centroid_label, centroid) in &centroids {
            let dist: f32 = point
                .iter()
                .zip(centroid)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                best = Some((*centroid_label, dist));
            }
        }
        *label = best.map_or(0, |(centroid_label, _)| centroid_label);
    }
}

fn remap_first_seen(labels: &mut [i32]) {
    let mut mapping: HashMap<i32, i32> = HashMap::new();
    for label in labels.iter_mut() {
        let next = mapping.len() as i32;
        *label = *mapping.entry(*label).or_insert(next);
    }
}

/// Assigns rows to the closest centroid (Euclidean); centroid `i` is cluster `i`.
#[derive(Debug, Clone)]
pub(super) struct NearestCentroid {
    centroids: Array2<f64>,
}

impl NearestCentroid {
    fn new(centroids: Array2<f64>) -> Self {
        Self { centroids }
    }

    /// Mean of each cluster's rows; labels must be dense `0..k`.
    fn from_labels(x: ArrayView2<'_, f64>, labels: ArrayView1<'_, usize>) -> Self {
        let k = labels.iter().copied().max().map_or(0, |max| max + 1);
        let mut centroids = Array2::<f64>::zeros((k, x.ncols()));
        let mut counts = vec![0usize; k];
        for (row, &label) in x.axis_iter(Axis(0)).zip(labels.iter()) {
            let mut centroid = centroids.row_mut(label);
            centroid += &row;
            counts[label] += 1;
        }
        for (mut centroid, count) in centroids.axis_iter_mut(Axis(0)).zip(counts) {
            if count > 0 {
                centroid /= count as f64;
            }
        }
        Self { centroids }
    }

    fn assign(&self, x: ArrayView2<'_, f64>) -> Array1<usize> {
        x.axis_iter(Axis(0))
            .map(|row| {
                let mut best = (0usize, f64::INFINITY);
                for (idx, centroid) in self.centroids.axis_iter(Axis(0)).enumerate() {
                    let dist: f64 = row
                        .iter()
                        .zip(centroid.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    if dist < best.1 {
                        best = (idx, dist);
                    }
                }
                best.0
            })
            .collect()
    }
}

impl Predictor for NearestCentroid {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Predictions, String> {
        if x.ncols() != self.centroids.ncols() {
            return Err(format!(
                "expected {} features, got {}",
                self.centroids.ncols(),
                x.ncols()
            ));
        }
        Ok(Predictions::Labels(self.assign(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_groups() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [0.3, 0.2],
            [0.2, 0.2],
            [9.0, 9.0],
            [9.2, 9.1],
            [9.1, 9.3],
            [9.3, 9.2],
            [9.2, 9.2],
        ]
    }

    #[test]
    fn kmeans_separates_obvious_groups() {
        let x = two_groups();
        let fitted = fit_kmeans(x.view(), 2, &KMeansParams::default(), 42).unwrap();
        let labels = fitted.predictions.as_labels().unwrap();
        assert!(labels.iter().take(5).all(|&l| l == labels[0]));
        assert!(labels.iter().skip(5).all(|&l| l == labels[5]));
        assert_ne!(labels[0], labels[5]);
        let unseen = fitted.predictor.predict(array![[8.5, 8.5]].view()).unwrap();
        assert_eq!(unseen.as_labels().unwrap()[0], labels[5]);
    }

    #[test]
    fn kmeans_is_deterministic_for_a_seed() {
        let x = two_groups();
        let a = fit_kmeans(x.view(), 3, &KMeansParams::default(), 7).unwrap();
        let b = fit_kmeans(x.view(), 3, &KMeansParams::default(), 7).unwrap();
        assert_eq!(a.predictions.as_labels(), b.predictions.as_labels());
    }

    #[test]
    fn kmeans_rejects_more_clusters_than_rows() {
        let x = array![[0.0], [1.0]];
        assert!(fit_kmeans(x.view(), 3, &KMeansParams::default(), 0).is_err());
    }

    #[test]
    fn hdbscan_tiny_dataset_is_one_cluster() {
        let x = array![[0.0, 1.0], [2.0, 3.0]];
        let fitted = fit_hdbscan(x.view(), &HdbscanParams::default()).unwrap();
        assert_eq!(fitted.predictions.as_labels().unwrap(), &array![0, 0]);
    }

    #[test]
    fn noise_joins_nearest_cluster() {
        let data = vec![vec![0.0, 0.0], vec![0.1, 0.0], vec![5.0, 5.0], vec![4.0, 4.0]];
        let mut labels = vec![3, 3, 1, -1];
        assign_noise_to_nearest(&data, &mut labels);
        assert_eq!(labels, vec![3, 3, 1, 1]);
    }

    #[test]
    fn all_noise_collapses_to_zero() {
        let data = vec![vec![0.0], vec![1.0]];
        let mut labels = vec![-1, -1];
        assign_noise_to_nearest(&data, &mut labels);
        assert_eq!(labels, vec![0, 0]);
    }

    #[test]
    fn remap_orders_by_first_appearance() {
        let mut labels = vec![4, 4, 2, 7, 2];
        remap_first_seen(&mut labels);
        assert_eq!(labels, vec![0, 0, 1, 2, 1]);
    }

    #[test]
    fn validation_rejects_degenerate_sizes() {
        let params = HdbscanParams {
            min_cluster_size: 1,
            ..HdbscanParams::default()
        };
        assert!(validate_hdbscan(&params).is_err());
        let params = HdbscanParams {
            min_samples: Some(0),
            ..HdbscanParams::default()
        };
        assert!(validate_hdbscan(&params).is_err());
        assert!(validate_hdbscan(&HdbscanParams::default()).is_ok());
    }

    #[test]
    fn centroids_from_labels_average_rows() {
        let x = array![[0.0, 0.0], [2.0, 2.0], [10.0, 10.0]];
        let labels = array![0, 0, 1];
        let model = NearestCentroid::from_labels(x.view(), labels.view());
        assert_eq!(model.centroids, array![[1.0, 1.0], [10.0, 10.0]]);
        assert!(model.predict(array![[1.0]].view()).is_err());
    }
}
