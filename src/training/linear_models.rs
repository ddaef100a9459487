//! Ordinary least squares regression

use super::models::{check_features, check_xy, Regressor};
use crate::error::{Result, ScorelineError};
use crate::optimizer::{unknown_param, ParamSet};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Returns `None` if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 * a[[i, i]].abs().max(1.0) {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
/// Returns eigenvalues and the matrix whose columns are the eigenvectors.
fn symmetric_eigen(a: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut m = a.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale: f64 = a.iter().map(|x| x * x).sum();

    for _sweep in 0..100 {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| m[[i, j]] * m[[i, j]])
            .sum();
        if off <= 1e-26 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if m[[p, q]].abs() < 1e-300 {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * m[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (m.diag().to_owned(), v)
}

/// Minimum-norm solution of a symmetric positive semi-definite system.
///
/// Directions with eigenvalues below a relative cutoff are dropped, which is
/// what makes collinear designs (e.g. a full one-hot block next to the
/// intercept) solvable.
fn pseudo_inverse_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n == 0 || n != a.ncols() || n != b.len() {
        return None;
    }
    let (values, vectors) = symmetric_eigen(a);
    let largest = values.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    if largest == 0.0 {
        return Some(Array1::zeros(n));
    }
    let cutoff = largest * n as f64 * 1e-12;

    let mut x = Array1::<f64>::zeros(n);
    for k in 0..n {
        if values[k] > cutoff {
            let v = vectors.column(k);
            let weight = v.dot(b) / values[k];
            x.scaled_add(weight, &v);
        }
    }
    if x.iter().all(|w| w.is_finite()) {
        Some(x)
    } else {
        None
    }
}

/// Solve least squares via normal equations: (X^T X) w = X^T y
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    cholesky_solve(&xtx, &xty).or_else(|| pseudo_inverse_solve(&xtx, &xty))
}

/// Linear regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;

        // Center data if fitting intercept
        let (coefficients, intercept) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| ScorelineError::Data("empty feature matrix".to_string()))?;
            let y_mean = y.mean().unwrap_or(0.0);
            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;

            let coef = solve_least_squares(&x_centered, &y_centered).ok_or_else(|| {
                ScorelineError::Computation("Matrix is singular, cannot solve least squares".to_string())
            })?;
            let intercept = y_mean - coef.dot(&x_mean);
            (coef, intercept)
        } else {
            let coef = solve_least_squares(x, y).ok_or_else(|| {
                ScorelineError::Computation("Matrix is singular, cannot solve least squares".to_string())
            })?;
            (coef, 0.0)
        };

        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(ScorelineError::ModelNotFitted)?;
        check_features(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            match name.as_str() {
                "fit_intercept" => self.fit_intercept = value.to_bool(name)?,
                _ => return Err(unknown_param("LinearRegression", name, value)),
            }
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParamValue;
    use ndarray::array;

    #[test]
    fn test_linear_regression_exact() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 2.0], [5.0, 1.0]];
        let y = x.column(0).mapv(|a| 3.0 * a) - x.column(1).mapv(|b| 2.0 * b) + 1.5;

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 3.0).abs() < 1e-9);
        assert!((coef[1] + 2.0).abs() < 1e-9);
        assert!((model.intercept - 1.5).abs() < 1e-9);
        assert!((model.score(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_one_hot_block() {
        // Both indicator columns together duplicate the intercept
        let x = array![
            [1.0, 0.0, 2.0],
            [0.0, 1.0, 3.0],
            [1.0, 0.0, 5.0],
            [0.0, 1.0, 1.0],
            [1.0, 0.0, 4.0],
            [0.0, 1.0, 6.0]
        ];
        let y = x.column(0).mapv(|a| 3.0 * a) + x.column(2).mapv(|c| 2.0 * c) + 1.0;

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let predicted = model.predict(&x).unwrap();
        for (p, t) in predicted.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8, "{p} vs {t}");
        }
        // Minimum-norm split of the indicator effect
        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] + coef[1]).abs() < 1e-8);
    }

    #[test]
    fn test_no_intercept() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 6.0];
        let mut model = LinearRegression::new().with_fit_intercept(false);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.intercept, 0.0);
        assert!((model.coefficients.as_ref().unwrap()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = LinearRegression::new();
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(ScorelineError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut model = LinearRegression::new();
        assert!(model.fit(&array![[1.0], [2.0]], &array![1.0]).is_err());
    }

    #[test]
    fn test_set_params() {
        let mut model = LinearRegression::new();
        let mut params = ParamSet::new();
        params.insert("fit_intercept".to_string(), ParamValue::Bool(false));
        model.set_params(&params).unwrap();
        assert!(!model.fit_intercept);

        params.insert("alpha".to_string(), ParamValue::Float(1.0));
        assert!(matches!(
            model.set_params(&params),
            Err(ScorelineError::InvalidParameter { .. })
        ));
    }
}
