//! End-to-end tests: arrays and CSV files in, persisted model and predictions out

use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scoreline::data::{
    write_csv, DataIngestion, DataIngestionConfig, DataTransformation, DataTransformationConfig,
    DatasetSplit,
};
use scoreline::inference::{PredictConfig, PredictPipeline, StudentRecord};
use scoreline::training::{
    DecisionTree, Estimator, LinearRegression, ModelCatalogue, ModelEvaluator, ModelTrainer,
    TrainerConfig,
};
use tempfile::TempDir;

// ============================================================================
// Reference least squares
// ============================================================================

/// Solve `a · w = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap();
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut w = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = (i + 1..n).map(|k| a[i][k] * w[k]).sum();
        w[i] = (b[i] - tail) / a[i][i];
    }
    w
}

/// Fit OLS with an intercept on `train` and return R² on `test`; last column is the target.
fn reference_r2(train: &Array2<f64>, test: &Array2<f64>) -> f64 {
    let p = train.ncols() - 1;
    let design = |row: ndarray::ArrayView1<f64>| {
        let mut v = vec![1.0];
        v.extend(row.iter().take(p));
        v
    };

    let mut xtx = vec![vec![0.0; p + 1]; p + 1];
    let mut xty = vec![0.0; p + 1];
    for row in train.rows() {
        let d = design(row);
        for i in 0..=p {
            for j in 0..=p {
                xtx[i][j] += d[i] * d[j];
            }
            xty[i] += d[i] * row[p];
        }
    }
    let w = solve(xtx, xty);

    let y: Vec<f64> = test.column(p).to_vec();
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (row, &actual) in test.rows().into_iter().zip(&y) {
        let predicted: f64 = design(row).iter().zip(&w).map(|(d, w)| d * w).sum();
        ss_res += (actual - predicted).powi(2);
        ss_tot += (actual - mean).powi(2);
    }
    1.0 - ss_res / ss_tot
}

fn regression_array(rows: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let mut data = Array2::zeros((rows, 4));
    for mut row in data.rows_mut() {
        let (a, b, c) = (
            rng.gen_range(0.0..10.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-5.0..5.0),
        );
        row[0] = a;
        row[1] = b;
        row[2] = c;
        row[3] = 1.7 * a - 4.0 * b + 0.8 * c + 12.0 + rng.gen_range(-2.0..2.0);
    }
    data
}

#[test]
fn test_linear_regression_matches_reference_r2() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let train = regression_array(100, &mut rng);
    let test = regression_array(20, &mut rng);
    let expected = reference_r2(&train, &test);

    let split = DatasetSplit::from_arrays(train, test).unwrap();
    let mut catalogue = ModelCatalogue::new()
        .with_model("linear regression", Estimator::from(LinearRegression::default()))
        .unwrap();
    let report = ModelEvaluator::new()
        .evaluate(&split, &mut catalogue, None)
        .unwrap();

    assert_eq!(report.len(), 1);
    let actual = report.score("linear regression").unwrap();
    assert!(
        (actual - expected).abs() < 1e-9,
        "R² {actual} differs from reference {expected}"
    );
}

#[test]
fn test_trainer_persists_and_reports() {
    let dir = TempDir::new().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let split = DatasetSplit::from_arrays(regression_array(100, &mut rng), regression_array(20, &mut rng)).unwrap();

    let catalogue = ModelCatalogue::new()
        .with_model("Decision Tree", Estimator::from(DecisionTree::default()))
        .and_then(|c| c.with_model("Linear Regression", Estimator::from(LinearRegression::default())))
        .unwrap();

    let config = TrainerConfig::new().with_model_path(dir.path().join("model.pkl"));
    let outcome = ModelTrainer::new(config).run(&split, catalogue).unwrap();

    assert_eq!(outcome.report.len(), 2);
    assert_eq!(outcome.selected.name, "Linear Regression");
    assert!(outcome.selected.score >= 0.6);
    assert!(dir.path().join("model.pkl").exists());
}

// ============================================================================
// CSV to prediction
// ============================================================================

const GENDERS: [&str; 2] = ["female", "male"];
const GROUPS: [&str; 5] = ["group A", "group B", "group C", "group D", "group E"];
const EDUCATION: [&str; 4] = [
    "some high school",
    "high school",
    "associate's degree",
    "bachelor's degree",
];
const LUNCH: [&str; 2] = ["standard", "free/reduced"];
const PREP: [&str; 2] = ["none", "completed"];

fn expected_math(gender: &str, lunch: &str, reading: f64, writing: f64) -> f64 {
    let lunch_bonus = if lunch == "standard" { 8.0 } else { 0.0 };
    let gender_bonus = if gender == "male" { 5.0 } else { 0.0 };
    0.5 * reading + 0.4 * writing + lunch_bonus + gender_bonus
}

fn students_csv(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut gender = Vec::with_capacity(rows);
    let mut group = Vec::with_capacity(rows);
    let mut education = Vec::with_capacity(rows);
    let mut lunch = Vec::with_capacity(rows);
    let mut prep = Vec::with_capacity(rows);
    let mut reading = Vec::with_capacity(rows);
    let mut writing = Vec::with_capacity(rows);
    let mut math = Vec::with_capacity(rows);

    for i in 0..rows {
        let g = GENDERS[i % GENDERS.len()];
        let l = LUNCH[(i / 2) % LUNCH.len()];
        let r: f64 = rng.gen_range(30.0..100.0);
        let w: f64 = rng.gen_range(30.0..100.0);
        gender.push(g);
        group.push(GROUPS[i % GROUPS.len()]);
        education.push(EDUCATION[i % EDUCATION.len()]);
        lunch.push(l);
        prep.push(PREP[(i / 3) % PREP.len()]);
        reading.push(r);
        writing.push(w);
        math.push(expected_math(g, l, r, w) + rng.gen_range(-1.0..1.0));
    }

    df!(
        "gender" => gender,
        "race_ethnicity" => group,
        "parental_level_of_education" => education,
        "lunch" => lunch,
        "test_preparation_course" => prep,
        "reading_score" => reading,
        "writing_score" => writing,
        "math_score" => math
    )
    .unwrap()
}

#[test]
fn test_csv_to_prediction() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("students.csv");
    write_csv(&source, &mut students_csv(200, 99)).unwrap();

    let ingestion = DataIngestion::new(DataIngestionConfig::in_dir(dir.path()));
    let (train_path, test_path) = ingestion.initiate_data_ingestion(&source).unwrap();
    assert!(train_path.exists());
    assert!(test_path.exists());

    let transformation = DataTransformation::new(
        DataTransformationConfig::default()
            .with_target("math_score")
            .with_preprocessor_path(dir.path().join("preprocessor.pkl")),
    );
    let transformed = transformation
        .initiate_data_transformation(&train_path, &test_path)
        .unwrap();
    assert_eq!(transformed.train.nrows(), 160);
    assert_eq!(transformed.test.nrows(), 40);

    let split = DatasetSplit::from_arrays(transformed.train, transformed.test).unwrap();
    let catalogue = ModelCatalogue::new()
        .with_model("Linear Regression", Estimator::from(LinearRegression::default()))
        .and_then(|c| c.with_model("Decision Tree", Estimator::from(DecisionTree::default())))
        .unwrap();
    let config = TrainerConfig::new().with_model_path(dir.path().join("model.pkl"));
    let outcome = ModelTrainer::new(config).run(&split, catalogue).unwrap();
    assert_eq!(outcome.selected.name, "Linear Regression");
    assert!(outcome.selected.score > 0.95);

    let records = vec![
        StudentRecord {
            gender: "male".to_string(),
            race_ethnicity: "group C".to_string(),
            parental_level_of_education: "high school".to_string(),
            lunch: "standard".to_string(),
            test_preparation_course: "completed".to_string(),
            reading_score: 80.0,
            writing_score: 70.0,
        },
        StudentRecord {
            gender: "female".to_string(),
            race_ethnicity: "group A".to_string(),
            parental_level_of_education: "bachelor's degree".to_string(),
            lunch: "free/reduced".to_string(),
            test_preparation_course: "none".to_string(),
            reading_score: 55.0,
            writing_score: 60.0,
        },
    ];

    let pipeline = PredictPipeline::new(PredictConfig::in_dir(dir.path()));
    let predictions: Array1<f64> = pipeline.predict_records(&records).unwrap();
    assert_eq!(predictions.len(), 2);
    for (record, predicted) in records.iter().zip(predictions.iter()) {
        let truth = expected_math(
            &record.gender,
            &record.lunch,
            record.reading_score,
            record.writing_score,
        );
        assert!((predicted - truth).abs() < 3.0, "predicted {predicted}, expected about {truth}");
    }
}

#[test]
fn test_unseen_category_is_rejected_at_prediction() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("students.csv");
    write_csv(&source, &mut students_csv(60, 5)).unwrap();

    let (train_path, test_path) = DataIngestion::new(DataIngestionConfig::in_dir(dir.path()))
        .initiate_data_ingestion(&source)
        .unwrap();
    let transformed = DataTransformation::new(
        DataTransformationConfig::default().with_preprocessor_path(dir.path().join("preprocessor.pkl")),
    )
    .initiate_data_transformation(&train_path, &test_path)
    .unwrap();
    let split = DatasetSplit::from_arrays(transformed.train, transformed.test).unwrap();
    let catalogue = ModelCatalogue::new()
        .with_model("Linear Regression", Estimator::from(LinearRegression::default()))
        .unwrap();
    ModelTrainer::new(TrainerConfig::new().with_model_path(dir.path().join("model.pkl")))
        .run(&split, catalogue)
        .unwrap();

    let record = StudentRecord {
        gender: "female".to_string(),
        race_ethnicity: "group Z".to_string(),
        parental_level_of_education: "high school".to_string(),
        lunch: "standard".to_string(),
        test_preparation_course: "none".to_string(),
        reading_score: 70.0,
        writing_score: 70.0,
    };
    let result = PredictPipeline::new(PredictConfig::in_dir(dir.path())).predict_records(&[record]);
    assert!(result.is_err());
}
