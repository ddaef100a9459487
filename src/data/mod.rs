//! Data preparation
//!
//! Ingestion copies the source CSV into the artifacts directory and splits
//! it; transformation fits the preprocessor and produces numeric arrays with
//! the target as the last column; [`DatasetSplit`] validates those arrays for
//! the evaluator.

mod ingestion;
mod split;
mod transformation;

pub use ingestion::{load_csv, train_test_split, write_csv, DataIngestion, DataIngestionConfig};
pub use split::DatasetSplit;
pub use transformation::{DataTransformation, DataTransformationConfig, TransformedData};
