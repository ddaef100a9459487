//! Error types for scoreline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scoreline operations
pub type Result<T> = std::result::Result<T, ScorelineError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum ScorelineError {
    /// Malformed or missing configuration, duplicate catalogue names, invalid grids
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A catalogue entry failed while being tuned, fitted or scored
    #[error("Evaluation of '{model}' failed: {source}")]
    Evaluation {
        model: String,
        #[source]
        source: Box<ScorelineError>,
    },

    /// The best candidate scored below the acceptance threshold
    #[error("No acceptable model: best was '{best_model}' with R2 {best_score:.4}, threshold {threshold}")]
    NoAcceptableModel {
        best_model: String,
        best_score: f64,
        threshold: f64,
    },

    /// Artifact could not be written or read back
    #[error("Storage error at {}: {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScorelineError {
    /// Wrap an estimator-level failure with the catalogue name it came from.
    pub fn evaluation(model: impl Into<String>, source: ScorelineError) -> Self {
        ScorelineError::Evaluation {
            model: model.into(),
            source: Box::new(source),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ScorelineError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_param(name: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        ScorelineError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for ScorelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        ScorelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ScorelineError {
    fn from(err: serde_json::Error) -> Self {
        ScorelineError::Data(err.to_string())
    }
}

impl From<serde_yaml::Error> for ScorelineError {
    fn from(err: serde_yaml::Error) -> Self {
        ScorelineError::Configuration(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ScorelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        ScorelineError::Shape {
            expected: "compatible shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScorelineError::Configuration("duplicate model name 'A'".to_string());
        assert_eq!(err.to_string(), "Configuration error: duplicate model name 'A'");

        let err = ScorelineError::Shape {
            expected: "100".to_string(),
            actual: "50".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid shape: expected 100, got 50");
    }

    #[test]
    fn test_evaluation_names_model() {
        let err = ScorelineError::evaluation("Decision Tree", ScorelineError::ModelNotFitted);
        let msg = err.to_string();
        assert!(msg.contains("Decision Tree"));
        assert!(msg.contains("Model not fitted"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_no_acceptable_model_display() {
        let err = ScorelineError::NoAcceptableModel {
            best_model: "B".to_string(),
            best_score: 0.5,
            threshold: 0.6,
        };
        assert!(err.to_string().contains("'B'"));
        assert!(err.to_string().contains("0.6"));
    }

    #[test]
    fn test_storage_display() {
        let err = ScorelineError::storage("artifacts/model.pkl", "permission denied");
        assert_eq!(
            err.to_string(),
            "Storage error at artifacts/model.pkl: permission denied"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScorelineError = io_err.into();
        assert!(matches!(err, ScorelineError::Io(_)));
    }
}
