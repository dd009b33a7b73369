use std::collections::BTreeMap;

use ndarray::{ArrayView1, ArrayView2};

use super::{ADJUSTED_RAND, Metrics, SILHOUETTE};
use crate::error::EnginError;

/// `silhouette`, followed by `adjusted_rand` when `truth` is supplied.
pub fn clustering_metrics(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
    truth: Option<ArrayView1<'_, usize>>,
) -> Result<Metrics, EnginError> {
    let mut metrics = Metrics::default();
    metrics.push(SILHOUETTE, silhouette_score(features, labels)?);
    if let Some(truth) = truth {
        metrics.push(ADJUSTED_RAND, adjusted_rand_index(truth, labels)?);
    }
    Ok(metrics)
}

/// Number of rows per cluster id, ordered by id.
pub fn cluster_sizes(labels: ArrayView1<'_, usize>) -> BTreeMap<usize, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

/// Mean silhouette coefficient with Euclidean distances.
///
/// Samples in singleton clusters score 0. Undefined unless
/// `2 <= n_clusters <= n_samples - 1`.
pub fn silhouette_score(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, usize>,
) -> Result<f64, EnginError> {
    let n = labels.len();
    if features.nrows() != n {
        return Err(EnginError::invalid(format!(
            "{} labels supplied for {} rows",
            n,
            features.nrows()
        )));
    }
    let sizes = cluster_sizes(labels);
    let k = sizes.len();
    if k < 2 {
        return Err(EnginError::undefined(
            SILHOUETTE,
            format!("needs at least 2 clusters, found {k}"),
        ));
    }
    if k > n - 1 {
        return Err(EnginError::undefined(
            SILHOUETTE,
            format!("{k} clusters for {n} samples; at most n_samples - 1 allowed"),
        ));
    }
    let dense: BTreeMap<usize, usize> = sizes.keys().enumerate().map(|(i, &l)| (l, i)).collect();
    let counts: Vec<f64> = sizes.values().map(|&c| c as f64).collect();
    let assigned: Vec<usize> = labels.iter().map(|label| dense[label]).collect();

    let mut total = 0.0;
    let mut sums = vec![0.0f64; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        let row_i = features.row(i);
        for j in 0..n {
            if i == j {
                continue;
            }
            let dist = row_i
                .iter()
                .zip(features.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            sums[assigned[j]] += dist;
        }
        let own = assigned[i];
        if counts[own] <= 1.0 {
            continue;
        }
        let a = sums[own] / (counts[own] - 1.0);
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sums[c] / counts[c])
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

/// Adjusted Rand index between ground truth and predicted clusterings.
///
/// Identical partitions (including the all-singleton and single-cluster
/// cases) score exactly 1.
pub fn adjusted_rand_index(
    truth: ArrayView1<'_, usize>,
    predicted: ArrayView1<'_, usize>,
) -> Result<f64, EnginError> {
    if truth.len() != predicted.len() {
        return Err(EnginError::invalid(format!(
            "Ground truth has {} labels but the clustering has {}",
            truth.len(),
            predicted.len()
        )));
    }
    let n = truth.len();
    let mut contingency: BTreeMap<(usize, usize), u64> = BTreeMap::new();
    for (&t, &p) in truth.iter().zip(predicted.iter()) {
        *contingency.entry((t, p)).or_insert(0) += 1;
    }
    let truth_sizes = cluster_sizes(truth);
    let predicted_sizes = cluster_sizes(predicted);
    let (n_classes, n_clusters) = (truth_sizes.len(), predicted_sizes.len());
    if n_classes == n_clusters && (n_classes <= 1 || n_classes == n) {
        return Ok(1.0);
    }

    let comb2 = |count: u64| (count * count.saturating_sub(1)) as f64 / 2.0;
    let sum_comb: f64 = contingency.values().map(|&c| comb2(c)).sum();
    let sum_truth: f64 = truth_sizes.values().map(|&c| comb2(c as u64)).sum();
    let sum_pred: f64 = predicted_sizes.values().map(|&c| comb2(c as u64)).sum();
    let expected = sum_truth * sum_pred / comb2(n as u64);
    let max_index = (sum_truth + sum_pred) / 2.0;
    let denom = max_index - expected;
    if denom == 0.0 {
        return Ok(1.0);
    }
    Ok((sum_comb - expected) / denom)
}
