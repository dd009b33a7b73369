//! 2-D layout of feature rows for the cluster scatter.

use linfa::prelude::*;
use linfa_reduction::Pca;
use ndarray::{Array2, ArrayView2, s};

/// Points to plot plus the axis captions that describe them.
#[derive(Debug, Clone)]
pub(crate) struct Projection {
    pub points: Array2<f64>,
    pub x_label: String,
    pub y_label: String,
}

/// Project `x` to two columns.
///
/// One feature is plotted against zero, two are used as-is, and wider data is
/// reduced with PCA. If PCA fails the first two features are used instead.
pub(crate) fn project_2d(x: ArrayView2<'_, f64>, feature_names: &[String]) -> Projection {
    let name = |idx: usize| {
        feature_names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("feature_{idx}"))
    };
    match x.ncols() {
        0 | 1 => Projection {
            points: Array2::from_shape_fn((x.nrows(), 2), |(row, col)| {
                if col == 0 && x.ncols() == 1 {
                    x[[row, 0]]
                } else {
                    0.0
                }
            }),
            x_label: name(0),
            y_label: String::new(),
        },
        2 => Projection {
            points: x.to_owned(),
            x_label: name(0),
            y_label: name(1),
        },
        _ => match pca(x) {
            Ok(points) => Projection {
                points,
                x_label: "PC1".to_string(),
                y_label: "PC2".to_string(),
            },
            Err(err) => {
                tracing::warn!("PCA projection failed, plotting the first two features: {err}");
                Projection {
                    points: x.slice(s![.., ..2]).to_owned(),
                    x_label: name(0),
                    y_label: name(1),
                }
            }
        },
    }
}

fn pca(x: ArrayView2<'_, f64>) -> Result<Array2<f64>, String> {
    let records = x.to_owned();
    let dataset = DatasetBase::from(records.clone());
    let model = Pca::params(2)
        .fit(&dataset)
        .map_err(|err| err.to_string())?;
    let points: Array2<f64> = model.predict(&records);
    if points.ncols() != 2 || points.iter().any(|v| !v.is_finite()) {
        return Err(format!("unexpected projection shape {:?}", points.dim()));
    }
    Ok(points)
}
