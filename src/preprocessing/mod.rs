//! Feature preprocessing
//!
//! - Missing value imputation (median for numeric, most frequent for categorical)
//! - One-hot encoding with sorted categories
//! - Standard scaling
//! - [`Preprocessor`], which assembles the above per column and is persisted
//!   next to the model

mod column;
mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use column::{numeric_values, string_values};
pub use config::PreprocessingConfig;
pub use encoder::{OneHotEncoder, UnknownCategory};
pub use imputer::{FillValue, ImputeStrategy, Imputer};
pub use pipeline::Preprocessor;
pub use scaler::StandardScaler;
