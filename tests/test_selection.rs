//! Integration tests for choosing and persisting the winning model

use ndarray::{Array1, Array2};
use scoreline::data::DatasetSplit;
use scoreline::export::load_object;
use scoreline::training::{
    DecisionTree, Estimator, EvaluationReport, LinearRegression, ModelCatalogue, ModelEvaluator,
    ModelSelector, Regressor,
};
use scoreline::ScorelineError;
use tempfile::TempDir;

fn linear_split() -> DatasetSplit {
    let x_train = Array2::from_shape_fn((60, 2), |(i, j)| ((i * (j + 3)) % 17) as f64);
    let y_train: Array1<f64> = x_train.rows().into_iter().map(|r| 1.5 * r[0] - 0.5 * r[1] + 4.0).collect();
    let x_test = Array2::from_shape_fn((15, 2), |(i, j)| ((i * (j + 5) + 2) % 13) as f64);
    let y_test: Array1<f64> = x_test.rows().into_iter().map(|r| 1.5 * r[0] - 0.5 * r[1] + 4.0).collect();
    DatasetSplit::new(x_train, y_train, x_test, y_test).unwrap()
}

// ============================================================================
// Choosing
// ============================================================================

#[test]
fn test_highest_score_wins() {
    let report = EvaluationReport::from_scores([("A", 0.4), ("B", 0.9), ("C", 0.7)]);
    let (name, score) = ModelSelector::default().choose(&report, ["A", "B", "C"]).unwrap();
    assert_eq!(name, "B");
    assert_eq!(score, 0.9);
}

#[test]
fn test_below_threshold_is_rejected() {
    let report = EvaluationReport::from_scores([("A", 0.4), ("B", 0.5)]);
    let err = ModelSelector::default().choose(&report, ["A", "B"]).unwrap_err();
    match err {
        ScorelineError::NoAcceptableModel {
            best_model,
            best_score,
            threshold,
        } => {
            assert_eq!(best_model, "B");
            assert_eq!(best_score, 0.5);
            assert_eq!(threshold, 0.6);
        }
        other => panic!("expected NoAcceptableModel, got {other:?}"),
    }
}

#[test]
fn test_tie_goes_to_first_entry() {
    let report = EvaluationReport::from_scores([("A", 0.8), ("B", 0.8)]);
    let (name, _) = ModelSelector::default().choose(&report, ["A", "B"]).unwrap();
    assert_eq!(name, "A");

    let (name, _) = ModelSelector::default().choose(&report, ["B", "A"]).unwrap();
    assert_eq!(name, "B");
}

#[test]
fn test_custom_threshold() {
    let report = EvaluationReport::from_scores([("A", 0.4), ("B", 0.5)]);
    let selector = ModelSelector::default().with_min_score(0.3);
    let (name, _) = selector.choose(&report, ["A", "B"]).unwrap();
    assert_eq!(name, "B");
}

#[test]
fn test_report_best_matches_selector() {
    let report = EvaluationReport::from_scores([("A", 0.7), ("B", f64::NAN), ("C", 0.7), ("D", 0.2)]);
    let best = report.best().unwrap();
    let (name, _) = ModelSelector::default()
        .choose(&report, ["A", "B", "C", "D"])
        .unwrap();
    assert_eq!(best.name, "A");
    assert_eq!(name, best.name);
}

// ============================================================================
// Persisting
// ============================================================================

#[test]
fn test_select_persists_fitted_winner() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("artifacts").join("model.pkl");

    let split = linear_split();
    let mut catalogue = ModelCatalogue::new()
        .with_model("Decision Tree", Estimator::from(DecisionTree::default()))
        .and_then(|c| c.with_model("Linear Regression", Estimator::from(LinearRegression::default())))
        .unwrap();

    let report = ModelEvaluator::new()
        .with_random_state(42)
        .evaluate(&split, &mut catalogue, None)
        .unwrap();
    let selected = ModelSelector::new(&path).select(&report, &catalogue).unwrap();

    assert_eq!(selected.name, "Linear Regression");
    assert!((selected.score - 1.0).abs() < 1e-9);
    assert_eq!(selected.path, path);
    assert!(path.exists());

    let restored: Estimator = load_object(&path).unwrap();
    assert_eq!(restored.family(), "linear_regression");
    let expected = selected.estimator.predict(split.x_test()).unwrap();
    let actual = restored.predict(split.x_test()).unwrap();
    assert_eq!(expected, actual);
}

#[test]
fn test_rejected_selection_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("model.pkl");

    let split = linear_split();
    let mut catalogue = ModelCatalogue::new()
        .with_model("Linear Regression", Estimator::from(LinearRegression::default()))
        .unwrap();
    let report = ModelEvaluator::new()
        .evaluate(&split, &mut catalogue, None)
        .unwrap();

    let err = ModelSelector::new(&path)
        .with_min_score(1.5)
        .select(&report, &catalogue)
        .unwrap_err();
    assert!(matches!(err, ScorelineError::NoAcceptableModel { .. }));
    assert!(!path.exists());
}

#[test]
fn test_unevaluated_catalogue_entry_is_configuration_error() {
    let report = EvaluationReport::from_scores([("A", 0.9)]);
    let catalogue = ModelCatalogue::new()
        .with_model("A", Estimator::from(LinearRegression::default()))
        .and_then(|c| c.with_model("B", Estimator::from(LinearRegression::default())))
        .unwrap();

    let dir = TempDir::new().unwrap();
    let err = ModelSelector::new(dir.path().join("model.pkl"))
        .select(&report, &catalogue)
        .unwrap_err();
    assert!(matches!(err, ScorelineError::Configuration(msg) if msg.contains("'B'")));
}
