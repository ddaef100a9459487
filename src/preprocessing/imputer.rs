//! Missing value imputation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Result, ScorelineError};

/// How a missing value is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    Mean,
    Median,
    /// Most common value; ties resolve to the smallest
    MostFrequent,
}

/// Fill value learned for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Categorical(String),
}

/// Per-column imputer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
        }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Learn the fill value of a numeric column
    pub fn fit_numeric(&mut self, column: &str, values: &[Option<f64>]) -> Result<()> {
        let mut present: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            return Err(ScorelineError::Preprocessing(format!(
                "column '{}' has no values to impute from",
                column
            )));
        }

        let fill = match self.strategy {
            ImputeStrategy::Mean => present.iter().sum::<f64>() / present.len() as f64,
            ImputeStrategy::Median => {
                present.sort_by(|a, b| a.total_cmp(b));
                let mid = present.len() / 2;
                if present.len() % 2 == 0 {
                    (present[mid - 1] + present[mid]) / 2.0
                } else {
                    present[mid]
                }
            }
            ImputeStrategy::MostFrequent => {
                let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
                for v in &present {
                    counts.entry(v.to_bits()).or_insert((*v, 0)).1 += 1;
                }
                counts
                    .values()
                    .fold(None::<(f64, usize)>, |best, &(v, c)| match best {
                        Some((bv, bc)) if bc > c || (bc == c && bv <= v) => Some((bv, bc)),
                        _ => Some((v, c)),
                    })
                    .map_or(0.0, |(v, _)| v)
            }
        };

        self.fill_values.insert(column.to_string(), FillValue::Numeric(fill));
        Ok(())
    }

    /// Learn the fill value of a categorical column. Only `MostFrequent` applies.
    pub fn fit_categorical(&mut self, column: &str, values: &[Option<String>]) -> Result<()> {
        if self.strategy != ImputeStrategy::MostFrequent {
            return Err(ScorelineError::Preprocessing(format!(
                "{:?} imputation is not defined for categorical column '{}'",
                self.strategy, column
            )));
        }

        // BTreeMap iteration is sorted, so the first maximum is the smallest value
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_insert(0) += 1;
        }
        let mut best: Option<(&str, usize)> = None;
        for (value, count) in counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }

        let (fill, _) = best.ok_or_else(|| {
            ScorelineError::Preprocessing(format!("column '{}' has no values to impute from", column))
        })?;
        self.fill_values
            .insert(column.to_string(), FillValue::Categorical(fill.to_string()));
        Ok(())
    }

    pub fn transform_numeric(&self, column: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
        match self.fill_values.get(column) {
            Some(FillValue::Numeric(fill)) => Ok(values
                .iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => *x,
                    _ => *fill,
                })
                .collect()),
            _ => Err(ScorelineError::ModelNotFitted),
        }
    }

    pub fn transform_categorical(&self, column: &str, values: &[Option<String>]) -> Result<Vec<String>> {
        match self.fill_values.get(column) {
            Some(FillValue::Categorical(fill)) => Ok(values
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
                .collect()),
            _ => Err(ScorelineError::ModelNotFitted),
        }
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values.get(column)
    }
}
