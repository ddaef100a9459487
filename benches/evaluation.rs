use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use scoreline::data::DatasetSplit;
use scoreline::optimizer::{HyperparameterConfig, ParamValue};
use scoreline::preprocessing::{PreprocessingConfig, Preprocessor};
use scoreline::training::{
    DecisionTree, Estimator, KNNRegressor, LinearRegression, ModelCatalogue, ModelEvaluator,
};
use polars::prelude::*;

fn create_split(n_rows: usize, n_features: usize) -> DatasetSplit {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut make = |rows: usize| {
        let x = Array2::from_shape_fn((rows, n_features), |_| rng.gen::<f64>() * 10.0);
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| r.sum() + rng.gen::<f64>() * 0.1)
            .collect();
        (x, y)
    };
    let (x_train, y_train) = make(n_rows);
    let (x_test, y_test) = make(n_rows / 5);
    DatasetSplit::new(x_train, y_train, x_test, y_test).unwrap()
}

fn small_catalogue() -> ModelCatalogue {
    ModelCatalogue::new()
        .with_model("Linear Regression", Estimator::from(LinearRegression::default()))
        .and_then(|c| c.with_model("Decision Tree", Estimator::from(DecisionTree::default())))
        .and_then(|c| c.with_model("K-Neighbors Regressor", Estimator::from(KNNRegressor::default())))
        .unwrap()
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    group.sample_size(10);

    for n_rows in [500, 2000].iter() {
        let split = create_split(*n_rows, 8);
        group.bench_with_input(BenchmarkId::new("catalogue", n_rows), &split, |b, split| {
            b.iter(|| {
                let mut catalogue = small_catalogue();
                ModelEvaluator::new()
                    .with_random_state(42)
                    .evaluate(black_box(split), &mut catalogue, None)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let split = create_split(1000, 8);
    let grids = HyperparameterConfig::new().with_param(
        "Decision Tree",
        "max_depth",
        vec![ParamValue::Int(2), ParamValue::Int(4), ParamValue::Int(8), ParamValue::Null],
    );

    group.bench_function("decision_tree_depths", |b| {
        b.iter(|| {
            let mut catalogue = ModelCatalogue::new()
                .with_model("Decision Tree", Estimator::from(DecisionTree::default()))
                .unwrap();
            ModelEvaluator::new()
                .with_random_state(42)
                .evaluate(&split, &mut catalogue, Some(black_box(&grids)))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let n = 5000;
    let lunch: Vec<&str> = (0..n).map(|i| if i % 3 == 0 { "free/reduced" } else { "standard" }).collect();
    let reading: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..100.0)).collect();
    let df = df!("lunch" => lunch, "reading_score" => reading).unwrap();

    group.bench_function("fit_transform", |b| {
        b.iter(|| {
            let mut preprocessor = Preprocessor::new(PreprocessingConfig::default());
            preprocessor.fit_transform(black_box(&df)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_grid_search, bench_preprocessing);
criterion_main!(benches);
