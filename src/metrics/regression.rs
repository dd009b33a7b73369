use ndarray::ArrayView1;
use smartcore::metrics::{mean_absolute_error, mean_squared_error, r2};

use super::{Metrics, REGRESSION_METRICS};
use crate::error::EnginError;

/// `mse`, `rmse`, `mae` and `r2` for paired truth/prediction vectors.
///
/// `r2 = 1 - SS_res / SS_tot`; a constant target scores `1.0` when predicted
/// exactly and `0.0` otherwise.
pub fn regression_metrics(
    y_true: ArrayView1<'_, f64>,
    y_pred: ArrayView1<'_, f64>,
) -> Result<Metrics, EnginError> {
    if y_true.len() != y_pred.len() {
        return Err(EnginError::invalid(format!(
            "y_true has {} values but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(EnginError::invalid("Cannot score empty regression output"));
    }
    let truth = y_true.to_vec();
    let predicted = y_pred.to_vec();
    let mse = mean_squared_error(&truth, &predicted);
    let mae = mean_absolute_error(&truth, &predicted);

    // smartcore divides by SS_tot unguarded.
    let first = y_true[0];
    let constant_target = y_true.iter().all(|t| *t == first);
    let r2_score = if constant_target {
        if mse == 0.0 { 1.0 } else { 0.0 }
    } else {
        r2(&truth, &predicted)
    };

    let [mse_name, rmse_name, mae_name, r2_name] = REGRESSION_METRICS;
    let mut metrics = Metrics::default();
    metrics.push(mse_name, mse);
    metrics.push(rmse_name, mse.sqrt());
    metrics.push(mae_name, mae);
    metrics.push(r2_name, r2_score);
    Ok(metrics)
}
