use std::collections::BTreeMap;

use ndarray::ArrayView1;

use super::{CLASSIFICATION_METRICS, Metrics};
use crate::error::EnginError;

#[derive(Debug, Clone, PartialEq)]
/// Confusion matrix over the label set observed in the true labels.
pub struct ConfusionMatrix {
    /// Sorted distinct labels; row/column `i` refers to `labels[i]`.
    pub labels: Vec<usize>,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u64>,
}

impl ConfusionMatrix {
    /// Tally paired labels. Every predicted label must appear in `y_true`.
    pub fn from_labels(
        y_true: ArrayView1<'_, usize>,
        y_pred: ArrayView1<'_, usize>,
    ) -> Result<Self, EnginError> {
        if y_true.len() != y_pred.len() {
            return Err(EnginError::invalid(format!(
                "y_true has {} labels but y_pred has {}",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(EnginError::invalid("Cannot score empty classification output"));
        }
        let index: BTreeMap<usize, usize> = {
            let mut labels: Vec<usize> = y_true.to_vec();
            labels.sort_unstable();
            labels.dedup();
            labels.into_iter().enumerate().map(|(i, l)| (l, i)).collect()
        };
        let n_classes = index.len();
        let mut matrix = Self {
            labels: index.keys().copied().collect(),
            counts: vec![0; n_classes * n_classes],
        };
        for (truth, predicted) in y_true.iter().zip(y_pred.iter()) {
            let Some(&col) = index.get(predicted) else {
                return Err(EnginError::invalid(format!(
                    "Predicted label {predicted} does not occur in the true labels"
                )));
            };
            let row = index[truth];
            matrix.counts[row * n_classes + col] += 1;
        }
        Ok(matrix)
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u64 {
        self.counts[truth * self.n_classes() + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Largest single cell, used for heatmap shading.
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    pub label: usize,
    /// `TP / (TP + FP)`, 0 when nothing was predicted as the class.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    /// Harmonic mean of precision and recall, 0 when both are 0.
    pub f1: f64,
    /// Total number of true examples for the class.
    pub support: u64,
}

/// Compute per-class precision, recall and F1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes();
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f64;
        let mut fp = 0f64;
        let mut fn_ = 0f64;
        let mut support = 0u64;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support += v;
            if j != class_idx {
                fn_ += v as f64;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f64;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            label: cm.labels[class_idx],
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let correct: u64 = (0..cm.n_classes()).map(|i| cm.get(i, i)).sum();
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// `accuracy`, then macro-averaged `precision`, `recall` and `f1`.
pub fn classification_metrics(
    y_true: ArrayView1<'_, usize>,
    y_pred: ArrayView1<'_, usize>,
) -> Result<Metrics, EnginError> {
    let cm = ConfusionMatrix::from_labels(y_true, y_pred)?;
    let per_class = precision_recall_by_class(&cm);
    let k = per_class.len() as f64;
    let macro_avg = |pick: fn(&PerClassStats) -> f64| per_class.iter().map(pick).sum::<f64>() / k;

    let [accuracy_name, precision_name, recall_name, f1_name] = CLASSIFICATION_METRICS;
    let mut metrics = Metrics::default();
    metrics.push(accuracy_name, accuracy(&cm));
    metrics.push(precision_name, macro_avg(|s| s.precision));
    metrics.push(recall_name, macro_avg(|s| s.recall));
    metrics.push(f1_name, macro_avg(|s| s.f1));
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn confusion_matrix_counts_pairs() {
        let y = array![0, 1, 2, 2, 1];
        let p = array![0, 2, 2, 2, 1];
        let cm = ConfusionMatrix::from_labels(y.view(), p.view()).unwrap();
        assert_eq!(cm.labels, vec![0, 1, 2]);
        assert_eq!(cm.get(1, 2), 1);
        assert_eq!(cm.get(2, 2), 2);
        assert_eq!(cm.total(), 5);
        assert_eq!(cm.max_count(), 2);
    }

    #[test]
    fn macro_metrics_match_reference() {
        // scikit-learn: precision_score(average="macro") == 0.2222..., recall 0.3333...
        let y = array![0, 1, 2, 0, 1, 2];
        let p = array![0, 2, 1, 0, 0, 1];
        let metrics = classification_metrics(y.view(), p.view()).unwrap();
        assert!((metrics["accuracy"] - 2.0 / 6.0).abs() < 1e-12);
        assert!((metrics["precision"] - 2.0 / 9.0).abs() < 1e-12);
        assert!((metrics["recall"] - 1.0 / 3.0).abs() < 1e-12);
        assert!((metrics["f1"] - 8.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn accuracy_is_match_fraction() {
        let y = array![3, 3, 7, 7];
        let p = array![3, 7, 7, 7];
        let metrics = classification_metrics(y.view(), p.view()).unwrap();
        assert_eq!(metrics["accuracy"], 0.75);
        assert_eq!(metrics.names(), CLASSIFICATION_METRICS.to_vec());
    }

    #[test]
    fn rejects_unknown_predicted_label() {
        let y = array![0, 1, 0];
        let p = array![0, 1, 5];
        let err = classification_metrics(y.view(), p.view()).unwrap_err();
        assert!(err.to_string().contains("label 5"));
    }
}
