//! Quality floor for the forest on a synthetic default-prediction table.
//!
//! 20% of rows default; the first two columns carry the signal and the
//! remaining six are uniform noise.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use credit_risk_rf::{
    ClassWeight, ConfusionMatrix, ForestClassifier, MaxFeatures, RandomForestConfig, RandomForestResult,
};

const N_ROWS: usize = 800;
const N_COLUMNS: usize = 8;

struct Table {
    rows: Vec<Vec<f64>>,
    labels: Vec<usize>,
    names: Vec<String>,
}

fn draw(seed: u64) -> Table {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<usize> = (0..N_ROWS).map(|i| usize::from(i % 5 == 0)).collect();
    let rows = labels
        .iter()
        .map(|&class| {
            (0..N_COLUMNS)
                .map(|c| {
                    let shift = if c < 2 { 2.0 * class as f64 } else { 0.0 };
                    shift + rng.r#gen::<f64>()
                })
                .collect()
        })
        .collect();
    let names = ["pay_0", "pay_2"]
        .into_iter()
        .map(String::from)
        .chain((2..N_COLUMNS).map(|c| format!("noise_{c}")))
        .collect();
    Table { rows, labels, names }
}

fn config() -> RandomForestConfig {
    RandomForestConfig::new(100)
        .unwrap()
        .with_max_depth(Some(10))
        .with_class_weight(ClassWeight::Balanced)
        .with_seed(42)
}

fn fit(table: &Table, config: &RandomForestConfig) -> RandomForestResult {
    config.fit(&table.rows, &table.labels, &table.names).unwrap()
}

fn holdout_matrix(seed: u64) -> ConfusionMatrix {
    let train = draw(42);
    let test = draw(seed);
    let mut clf = ForestClassifier::new(config());
    clf.train(&train.rows, &train.labels, &train.names).unwrap();
    let predicted = clf.predict(&test.rows).unwrap();
    ConfusionMatrix::from_labels(&test.labels, &predicted, 2).unwrap()
}

#[test]
fn holdout_accuracy_stays_above_ninety_percent() {
    let cm = holdout_matrix(7);
    assert!(cm.accuracy() > 0.90, "holdout accuracy {}", cm.accuracy());
}

#[test]
fn defaulters_are_recalled_with_balanced_weights() {
    let recall = holdout_matrix(11).class_metrics()[1].recall;
    assert!(recall > 0.85, "default recall {recall}");
}

#[test]
fn signal_columns_lead_the_ranking() {
    let result = fit(&draw(42), &config());
    let mut top: Vec<&str> = result.importances()[..2].iter().map(|f| f.name.as_str()).collect();
    top.sort_unstable();
    assert_eq!(top, ["pay_0", "pay_2"]);
    let total: f64 = result.importances().iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn thread_scheduling_does_not_change_probabilities() {
    let table = draw(42);
    let config = config().with_max_features(MaxFeatures::Log2);
    let first = fit(&table, &config).into_forest();
    let second = fit(&table, &config).into_forest();
    let a = first.predict_proba_batch(&table.rows).unwrap();
    let b = second.predict_proba_batch(&table.rows).unwrap();
    assert!(a.iter().zip(&b).all(|(x, y)| x.as_slice() == y.as_slice()));
}

#[test]
fn training_rows_are_fit_closely() {
    let table = draw(42);
    let result = fit(&table, &config());
    let predicted = result.forest().predict_batch(&table.rows).unwrap();
    let cm = ConfusionMatrix::from_labels(&table.labels, &predicted, 2).unwrap();
    assert!(cm.accuracy() > 0.95, "training accuracy {}", cm.accuracy());
    assert_eq!(result.metadata().n_samples, N_ROWS);
    assert!(result.metadata().mean_depth <= 10.0);
}
