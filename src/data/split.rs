//! Validated train/test matrices

use ndarray::{s, Array1, Array2};

use crate::error::{Result, ScorelineError};

/// Fixed train/test split shared by every model in an evaluation run.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_test: Array2<f64>,
    y_test: Array1<f64>,
}

impl DatasetSplit {
    /// Build from two matrices whose last column is the target.
    pub fn from_arrays(train: Array2<f64>, test: Array2<f64>) -> Result<Self> {
        if train.ncols() < 2 {
            return Err(ScorelineError::Data(format!(
                "train array needs at least one feature and a target column, got {} columns",
                train.ncols()
            )));
        }
        if train.ncols() != test.ncols() {
            return Err(ScorelineError::Shape {
                expected: format!("{} test columns", train.ncols()),
                actual: format!("{} test columns", test.ncols()),
            });
        }

        let last = train.ncols() - 1;
        Self::new(
            train.slice(s![.., ..last]).to_owned(),
            train.column(last).to_owned(),
            test.slice(s![.., ..last]).to_owned(),
            test.column(last).to_owned(),
        )
    }

    pub fn new(
        x_train: Array2<f64>,
        y_train: Array1<f64>,
        x_test: Array2<f64>,
        y_test: Array1<f64>,
    ) -> Result<Self> {
        if x_train.nrows() == 0 || x_test.nrows() == 0 {
            return Err(ScorelineError::Data(
                "train and test sets must both have rows".to_string(),
            ));
        }
        if x_train.ncols() == 0 || x_train.ncols() != x_test.ncols() {
            return Err(ScorelineError::Shape {
                expected: format!("{} features in both sets", x_train.ncols()),
                actual: format!("{} test features", x_test.ncols()),
            });
        }
        if x_train.nrows() != y_train.len() || x_test.nrows() != y_test.len() {
            return Err(ScorelineError::Shape {
                expected: "one target per row".to_string(),
                actual: format!(
                    "{}/{} train, {}/{} test",
                    y_train.len(),
                    x_train.nrows(),
                    y_test.len(),
                    x_test.nrows()
                ),
            });
        }
        let all_finite = x_train.iter().chain(x_test.iter()).all(|v| v.is_finite())
            && y_train.iter().chain(y_test.iter()).all(|v| v.is_finite());
        if !all_finite {
            return Err(ScorelineError::Data(
                "split contains NaN or infinite values".to_string(),
            ));
        }

        Ok(Self {
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    pub fn x_train(&self) -> &Array2<f64> {
        &self.x_train
    }

    pub fn y_train(&self) -> &Array1<f64> {
        &self.y_train
    }

    pub fn x_test(&self) -> &Array2<f64> {
        &self.x_test
    }

    pub fn y_test(&self) -> &Array1<f64> {
        &self.y_test
    }

    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}
