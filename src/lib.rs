//! Scoreline - regression model selection
//!
//! Trains a catalogue of regressors on a fixed train/test split, keeps the
//! one with the best held-out R², persists it next to its preprocessor and
//! serves predictions from those artifacts.
//!
//! # Modules
//!
//! ## Core
//! - [`training`] - Regressors, catalogue, evaluator, selector, trainer
//! - [`optimizer`] - Hyperparameter grids and cross-validated grid search
//! - [`export`] - Framed, checksummed artifact storage
//! - [`inference`] - Prediction from persisted artifacts
//!
//! ## Data
//! - [`data`] - CSV ingestion, train/test split, transformation
//! - [`preprocessing`] - Imputation, one-hot encoding, scaling
//!
//! ## Interface
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core modules
pub mod export;
pub mod inference;
pub mod optimizer;
pub mod training;

// Data
pub mod data;
pub mod preprocessing;

// Interface
pub mod cli;

pub use error::{Result, ScorelineError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, ScorelineError};

    // Data
    pub use crate::data::{DataIngestion, DataIngestionConfig, DataTransformation, DataTransformationConfig, DatasetSplit};

    // Preprocessing
    pub use crate::preprocessing::{PreprocessingConfig, Preprocessor};

    // Training
    pub use crate::training::{
        Estimator, EvaluationReport, ModelCatalogue, ModelEvaluator, ModelScore, ModelSelector,
        ModelTrainer, Regressor, SelectedModel, TrainerConfig,
    };

    // Optimization
    pub use crate::optimizer::{GridSearch, HyperparameterConfig, ParamGrid, ParamSet, ParamValue};

    // Export
    pub use crate::export::{Artifact, ObjectStore};

    // Inference
    pub use crate::inference::{PredictConfig, PredictPipeline, StudentRecord};
}
