//! Column standardization

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScorelineError};

/// Standard scaler: (x - mean) / std, with population standard deviation.
///
/// Zero-variance columns keep a scale of 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    with_mean: bool,
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StandardScaler {
    pub fn new(with_mean: bool) -> Self {
        Self {
            with_mean,
            mean: None,
            scale: None,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(ScorelineError::Preprocessing(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            ScorelineError::Preprocessing("cannot compute column means".to_string())
        })?;
        let scale = x
            .var_axis(Axis(0), 0.0)
            .mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(ScorelineError::ModelNotFitted),
        };
        if x.ncols() != scale.len() {
            return Err(ScorelineError::Shape {
                expected: format!("{} columns", scale.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.to_owned();
        if self.with_mean {
            out -= mean;
        }
        out /= scale;
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardizes_columns() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::default();
        let out = scaler.fit_transform(&x).unwrap();

        let col0 = out.column(0);
        assert!((col0.sum()).abs() < 1e-12);
        assert!((col0.mapv(|v| v * v).sum() / 3.0 - 1.0).abs() < 1e-12);
        // constant column centres to zero with unit scale
        assert!(out.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_without_mean_keeps_zeros() {
        let x = array![[0.0], [1.0], [1.0], [0.0]];
        let mut scaler = StandardScaler::new(false);
        let out = scaler.fit_transform(&x).unwrap();
        assert_eq!(out[[0, 0]], 0.0);
        assert!((out[[1, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_and_shape() {
        let scaler = StandardScaler::default();
        assert!(scaler.transform(&array![[1.0]]).is_err());

        let mut scaler = StandardScaler::default();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(ScorelineError::Shape { .. })
        ));
    }
}
