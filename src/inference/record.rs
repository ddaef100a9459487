//! Typed input rows for the student performance schema

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One student's attributes, as entered in a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub gender: String,
    pub race_ethnicity: String,
    pub parental_level_of_education: String,
    pub lunch: String,
    pub test_preparation_course: String,
    pub reading_score: f64,
    pub writing_score: f64,
}

impl StudentRecord {
    /// Single-row frame with the training column names
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        records_to_dataframe(std::slice::from_ref(self))
    }
}

/// Frame with one row per record, in order
pub fn records_to_dataframe(records: &[StudentRecord]) -> Result<DataFrame> {
    fn text<'a>(records: &'a [StudentRecord], f: impl Fn(&'a StudentRecord) -> &'a str) -> Vec<&'a str> {
        records.iter().map(f).collect()
    }

    let df = DataFrame::new(vec![
        Column::new("gender".into(), text(records, |r| r.gender.as_str())),
        Column::new("race_ethnicity".into(), text(records, |r| r.race_ethnicity.as_str())),
        Column::new(
            "parental_level_of_education".into(),
            text(records, |r| r.parental_level_of_education.as_str()),
        ),
        Column::new("lunch".into(), text(records, |r| r.lunch.as_str())),
        Column::new(
            "test_preparation_course".into(),
            text(records, |r| r.test_preparation_course.as_str()),
        ),
        Column::new(
            "reading_score".into(),
            records.iter().map(|r| r.reading_score).collect::<Vec<f64>>(),
        ),
        Column::new(
            "writing_score".into(),
            records.iter().map(|r| r.writing_score).collect::<Vec<f64>>(),
        ),
    ])?;
    Ok(df)
}
