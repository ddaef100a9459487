//! Raw CSV ingestion and seeded train/test split

use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, ScorelineError};

/// Where ingestion writes its copies of the data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    pub raw_data_path: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for DataIngestionConfig {
    fn default() -> Self {
        Self::in_dir("artifacts")
    }
}

impl DataIngestionConfig {
    /// Standard file names under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            raw_data_path: dir.join("data.csv"),
            train_data_path: dir.join("train.csv"),
            test_data_path: dir.join("test.csv"),
            test_size: 0.2,
            random_state: 42,
        }
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Reads a source CSV and writes raw, train and test copies.
#[derive(Debug, Clone, Default)]
pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataIngestionConfig {
        &self.config
    }

    /// Returns the train and test CSV paths.
    pub fn initiate_data_ingestion(&self, source: impl AsRef<Path>) -> Result<(PathBuf, PathBuf)> {
        let source = source.as_ref();
        info!(source = %source.display(), "Starting data ingestion");

        let mut df = load_csv(source)?;
        write_csv(&self.config.raw_data_path, &mut df)?;

        let (mut train, mut test) = train_test_split(&df, self.config.test_size, self.config.random_state)?;
        write_csv(&self.config.train_data_path, &mut train)?;
        write_csv(&self.config.test_data_path, &mut test)?;

        info!(
            rows = df.height(),
            train_rows = train.height(),
            test_rows = test.height(),
            "Data ingestion complete"
        );
        Ok((
            self.config.train_data_path.clone(),
            self.config.test_data_path.clone(),
        ))
    }
}

/// Shuffle rows with a seeded RNG and cut off `test_size` of them.
///
/// The test set gets `ceil(n * test_size)` rows; both sides keep at least one.
pub fn train_test_split(df: &DataFrame, test_size: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ScorelineError::Configuration(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    let n = df.height();
    if n < 2 {
        return Err(ScorelineError::Data(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = ((n as f64) * test_size).ceil().clamp(1.0, (n - 1) as f64) as usize;
    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
    Ok((train, test))
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ScorelineError::Data(format!("failed to open {}: {}", path.display(), e)))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(file)
        .finish()?;
    Ok(df)
}

pub fn write_csv(path: impl AsRef<Path>, df: &mut DataFrame) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> DataFrame {
        let ids: Vec<i64> = (0..n as i64).collect();
        let vals: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
        DataFrame::new(vec![Column::new("id".into(), ids), Column::new("v".into(), vals)]).unwrap()
    }

    #[test]
    fn test_split_sizes_and_disjoint() {
        let df = frame(10);
        let (train, test) = train_test_split(&df, 0.2, 42).unwrap();
        assert_eq!(train.height(), 8);
        assert_eq!(test.height(), 2);

        let mut ids: Vec<i64> = train
            .column("id")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .chain(test.column("id").unwrap().as_materialized_series().i64().unwrap().into_no_null_iter())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        let df = frame(30);
        let (a, _) = train_test_split(&df, 0.3, 7).unwrap();
        let (b, _) = train_test_split(&df, 0.3, 7).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(train_test_split(&frame(5), 1.0, 0).is_err());
        assert!(train_test_split(&frame(1), 0.5, 0).is_err());
    }

    #[test]
    fn test_ingestion_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.csv");
        write_csv(&source, &mut frame(20)).unwrap();

        let ingestion = DataIngestion::new(DataIngestionConfig::in_dir(dir.path().join("artifacts")));
        let (train_path, test_path) = ingestion.initiate_data_ingestion(&source).unwrap();

        assert!(ingestion.config().raw_data_path.exists());
        assert_eq!(load_csv(&train_path).unwrap().height(), 16);
        assert_eq!(load_csv(&test_path).unwrap().height(), 4);
    }
}
