//! Model training and selection
//!
//! Regressor families, all behind the [`Regressor`] trait:
//! - Linear regression (OLS)
//! - Decision tree and random forest
//! - Gradient boosting, XGBoost-style and CatBoost-style boosting
//! - K-nearest neighbours
//! - AdaBoost.R2
//!
//! On top of those sit the [`ModelCatalogue`], the [`ModelEvaluator`] that
//! tunes, fits and scores every entry, the [`ModelSelector`] that keeps the
//! best one, and the [`ModelTrainer`] that runs the whole loop.

mod catalogue;
mod config;
mod estimator;
mod evaluator;
mod models;
mod selector;
mod trainer;
pub mod adaboost;
pub mod catboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod random_forest;
pub mod xgboost;

pub use adaboost::{AdaBoostLoss, AdaBoostRegressor};
pub use catalogue::ModelCatalogue;
pub use catboost::{CatBoostConfig, CatBoostRegressor};
pub use config::TrainerConfig;
pub use cross_validation::{CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, MaxFeatures, TreeNode};
pub use estimator::Estimator;
pub use evaluator::{EvaluationReport, ModelEvaluator, ModelScore};
pub(crate) use evaluator::rank;
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::LinearRegression;
pub use models::{r2_score, Regressor};
pub use random_forest::RandomForest;
pub use selector::{ModelSelector, SelectedModel};
pub use trainer::{ModelTrainer, TrainingOutcome};
pub use xgboost::{XGBoostConfig, XGBoostRegressor};

use crate::export::Artifact;

impl Artifact for Estimator {
    const KIND: &'static str = "estimator";
}
