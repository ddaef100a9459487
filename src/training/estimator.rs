//! Persisted union of the supported regressor families

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::adaboost::AdaBoostRegressor;
use super::catboost::CatBoostRegressor;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingRegressor;
use super::knn::KNNRegressor;
use super::linear_models::LinearRegression;
use super::models::Regressor;
use super::random_forest::RandomForest;
use super::xgboost::XGBoostRegressor;
use crate::error::Result;
use crate::optimizer::ParamSet;

/// A fitted or unfitted estimator of any supported family.
///
/// This is what the object store writes to `model.pkl`, so the variant tag
/// travels with the weights and a loaded model knows how to predict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LinearRegression(LinearRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingRegressor),
    KNeighbors(KNNRegressor),
    XGBoost(XGBoostRegressor),
    CatBoost(CatBoostRegressor),
    AdaBoost(AdaBoostRegressor),
}

impl Estimator {
    /// Short family name, stable across releases
    pub fn family(&self) -> &'static str {
        match self {
            Estimator::LinearRegression(_) => "linear_regression",
            Estimator::DecisionTree(_) => "decision_tree",
            Estimator::RandomForest(_) => "random_forest",
            Estimator::GradientBoosting(_) => "gradient_boosting",
            Estimator::KNeighbors(_) => "k_neighbors",
            Estimator::XGBoost(_) => "xgboost",
            Estimator::CatBoost(_) => "catboost",
            Estimator::AdaBoost(_) => "adaboost",
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::XGBoost(m) => m,
            Estimator::CatBoost(m) => m,
            Estimator::AdaBoost(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Estimator::LinearRegression(m) => m,
            Estimator::DecisionTree(m) => m,
            Estimator::RandomForest(m) => m,
            Estimator::GradientBoosting(m) => m,
            Estimator::KNeighbors(m) => m,
            Estimator::XGBoost(m) => m,
            Estimator::CatBoost(m) => m,
            Estimator::AdaBoost(m) => m,
        }
    }
}

impl Regressor for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        self.as_regressor_mut().set_params(params)
    }

    fn set_random_state(&mut self, seed: u64) {
        self.as_regressor_mut().set_random_state(seed)
    }

    fn is_fitted(&self) -> bool {
        self.as_regressor().is_fitted()
    }
}

impl From<LinearRegression> for Estimator {
    fn from(m: LinearRegression) -> Self {
        Estimator::LinearRegression(m)
    }
}

impl From<DecisionTree> for Estimator {
    fn from(m: DecisionTree) -> Self {
        Estimator::DecisionTree(m)
    }
}

impl From<RandomForest> for Estimator {
    fn from(m: RandomForest) -> Self {
        Estimator::RandomForest(m)
    }
}

impl From<GradientBoostingRegressor> for Estimator {
    fn from(m: GradientBoostingRegressor) -> Self {
        Estimator::GradientBoosting(m)
    }
}

impl From<KNNRegressor> for Estimator {
    fn from(m: KNNRegressor) -> Self {
        Estimator::KNeighbors(m)
    }
}

impl From<XGBoostRegressor> for Estimator {
    fn from(m: XGBoostRegressor) -> Self {
        Estimator::XGBoost(m)
    }
}

impl From<CatBoostRegressor> for Estimator {
    fn from(m: CatBoostRegressor) -> Self {
        Estimator::CatBoost(m)
    }
}

impl From<AdaBoostRegressor> for Estimator {
    fn from(m: AdaBoostRegressor) -> Self {
        Estimator::AdaBoost(m)
    }
}
