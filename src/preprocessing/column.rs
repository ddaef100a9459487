//! Typed column extraction from polars frames

use polars::prelude::*;

use crate::error::{Result, ScorelineError};

pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub(crate) fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Boolean | DataType::Categorical(_, _))
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let column = df
        .column(name)
        .map_err(|_| ScorelineError::FeatureNotFound(name.to_string()))?;
    Ok(column.as_materialized_series())
}

/// Values of a numeric column as `f64`, nulls as `None`
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = series(df, name)?;
    if !is_numeric_dtype(series.dtype()) {
        return Err(ScorelineError::Preprocessing(format!(
            "column '{}' has dtype {}, expected numeric",
            name,
            series.dtype()
        )));
    }
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Values of any column rendered as strings, nulls as `None`
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = series(df, name)?;
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cast_and_nulls() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[Some(1i64), None, Some(3)])]).unwrap();
        assert_eq!(numeric_values(&df, "a").unwrap(), vec![Some(1.0), None, Some(3.0)]);
        assert!(matches!(
            numeric_values(&df, "missing"),
            Err(ScorelineError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_string_column_rejected_as_numeric() {
        let df = DataFrame::new(vec![Column::new("s".into(), &["x", "y"])]).unwrap();
        assert!(numeric_values(&df, "s").is_err());
        assert_eq!(
            string_values(&df, "s").unwrap(),
            vec![Some("x".to_string()), Some("y".to_string())]
        );
    }
}
