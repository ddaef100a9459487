//! Hyperparameter values, parameter sets and exhaustive grids

use crate::error::{Result, ScorelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value as it appears in a grid or parameter file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn to_f64(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            other => Err(ScorelineError::invalid_param(name, other, "expected a number")),
        }
    }

    pub fn to_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            ParamValue::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Ok(*v as usize),
            other => Err(ScorelineError::invalid_param(
                name,
                other,
                "expected a non-negative integer",
            )),
        }
    }

    /// `null` maps to `None`, e.g. an unlimited `max_depth`.
    pub fn to_optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::Null => Ok(None),
            other => other.to_usize(name).map(Some),
        }
    }

    pub fn to_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            other => Err(ScorelineError::invalid_param(name, other, "expected a boolean")),
        }
    }

    pub fn to_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Str(v) => Ok(v.as_str()),
            other => Err(ScorelineError::invalid_param(name, other, "expected a string")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => write!(f, "null"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete assignment of hyperparameters, ordered by name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Candidate values per hyperparameter.
pub type ParamGrid = BTreeMap<String, Vec<ParamValue>>;

/// Error for a parameter name an estimator does not recognise.
pub fn unknown_param(estimator: &str, name: &str, value: &ParamValue) -> ScorelineError {
    ScorelineError::invalid_param(name, value, format!("not a parameter of {estimator}"))
}

/// Every combination of the grid, in sorted-key order with the last key varying fastest.
///
/// An empty grid yields a single empty parameter set.
pub fn grid_candidates(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut candidates = vec![ParamSet::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(candidates.len() * values.len());
        for base in &candidates {
            for value in values {
                let mut params = base.clone();
                params.insert(name.clone(), value.clone());
                next.push(params);
            }
        }
        candidates = next;
    }
    candidates
}

/// Reject grids that would produce no candidates at all.
pub fn validate_grid(grid: &ParamGrid) -> Result<()> {
    for (name, values) in grid {
        if values.is_empty() {
            return Err(ScorelineError::Configuration(format!(
                "parameter '{name}' has an empty list of candidate values"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_cartesian_order() {
        let mut grid = ParamGrid::new();
        grid.insert("b".to_string(), vec![1i64.into(), 2i64.into()]);
        grid.insert("a".to_string(), vec!["x".into(), "y".into()]);

        let cands = grid_candidates(&grid);
        assert_eq!(cands.len(), 4);
        assert_eq!(cands[0]["a"], ParamValue::from("x"));
        assert_eq!(cands[0]["b"], ParamValue::Int(1));
        assert_eq!(cands[1]["a"], ParamValue::from("x"));
        assert_eq!(cands[1]["b"], ParamValue::Int(2));
        assert_eq!(cands[3]["a"], ParamValue::from("y"));
    }

    #[test]
    fn test_empty_grid_single_candidate() {
        let cands = grid_candidates(&ParamGrid::new());
        assert_eq!(cands.len(), 1);
        assert!(cands[0].is_empty());
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let mut grid = ParamGrid::new();
        grid.insert("max_depth".to_string(), vec![]);
        assert!(matches!(
            validate_grid(&grid),
            Err(ScorelineError::Configuration(_))
        ));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(ParamValue::Int(3).to_f64("x").unwrap(), 3.0);
        assert_eq!(ParamValue::Int(3).to_usize("x").unwrap(), 3);
        assert_eq!(ParamValue::Null.to_optional_usize("x").unwrap(), None);
        assert!(ParamValue::Int(-1).to_usize("x").is_err());
        assert!(ParamValue::from("deep").to_f64("x").is_err());
        assert!(ParamValue::Bool(true).to_bool("x").unwrap());
    }

    #[test]
    fn test_untagged_yaml_values() {
        let values: Vec<ParamValue> = serde_yaml::from_str("[1, 0.5, true, squared_error, null]").unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Int(1),
                ParamValue::Float(0.5),
                ParamValue::Bool(true),
                ParamValue::from("squared_error"),
                ParamValue::Null,
            ]
        );
    }
}
