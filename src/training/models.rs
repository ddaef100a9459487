//! Regressor capability trait and R² scoring

use crate::error::{Result, ScorelineError};
use crate::optimizer::ParamSet;
use ndarray::{Array1, Array2};

/// Anything that can be fitted on a numeric matrix and predict a numeric target.
///
/// Implementations are cloned per grid-search candidate and per fold, so
/// `fit` must fully reset previously learned state.
pub trait Regressor: Send + Sync {
    /// Fit on training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Apply a parameter set. Unknown names or mistyped values are
    /// [`ScorelineError::InvalidParameter`].
    fn set_params(&mut self, params: &ParamSet) -> Result<()>;

    /// Seed any internal randomness. Deterministic estimators ignore this.
    fn set_random_state(&mut self, _seed: u64) {}

    fn is_fitted(&self) -> bool;

    /// R² of predictions on `x` against `y`
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        r2_score(y, &y_pred)
    }
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_targets(y_true, y_pred)?;

    let n = y_true.len() as f64;
    let y_mean = y_true.sum() / n;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn check_targets(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(ScorelineError::Shape {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(ScorelineError::Data("cannot score an empty target".to_string()));
    }
    if y_pred.iter().any(|v| !v.is_finite()) {
        return Err(ScorelineError::Computation(
            "predictions contain non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Check that `x` and `y` describe the same number of rows.
pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ScorelineError::Shape {
            expected: format!("{} rows", x.nrows()),
            actual: format!("{} targets", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(ScorelineError::Data("cannot fit on zero rows".to_string()));
    }
    Ok(())
}

/// Check that a prediction matrix matches the fitted feature count.
pub(crate) fn check_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(ScorelineError::Shape {
            expected: format!("{expected} features"),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}
