//! Prediction from persisted artifacts
//!
//! [`PredictPipeline`] loads the fitted preprocessor and the selected model,
//! transforms raw rows and predicts. [`StudentRecord`] builds those rows for
//! the student performance schema.

mod config;
mod pipeline;
mod record;

pub use config::PredictConfig;
pub use pipeline::{LoadedPipeline, PredictPipeline};
pub use record::{records_to_dataframe, StudentRecord};
