//! End-to-end artifact tests: train -> evaluate -> explain -> SVG files.

use std::fs;
use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use credit_risk_io::SvgReportSink;
use credit_risk_report::{ChartJob, Evaluator, Explainer};
use credit_risk_rf::{ClassWeight, ForestClassifier, RandomForestConfig};

/// 400 rows, 6 features, ~25% positives driven by features 0 and 1.
fn make_data(seed: u64) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(400);
    let mut y = Vec::with_capacity(400);
    for i in 0..400 {
        let class = usize::from(i % 4 == 0);
        let row: Vec<f64> = (0..6)
            .map(|f| {
                let shift = if f < 2 { class as f64 * 1.5 } else { 0.0 };
                shift + rng.r#gen::<f64>()
            })
            .collect();
        x.push(row);
        y.push(class);
    }
    let names = ["pay_0", "limit_bal", "age", "bill_amt1", "sex_2", "education_2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    (x, y, names)
}

fn trained() -> (ForestClassifier, Vec<String>) {
    let (x, y, names) = make_data(1);
    let mut clf = ForestClassifier::new(
        RandomForestConfig::new(30)
            .unwrap()
            .with_max_depth(Some(10))
            .with_class_weight(ClassWeight::Balanced)
            .with_seed(42),
    );
    clf.train(&x, &y, &names).unwrap();
    (clf, names)
}

#[test]
fn evaluation_writes_confusion_matrix_and_serializes() {
    let (clf, _) = trained();
    let (x_test, y_test, _) = make_data(2);
    let dir = TempDir::new().unwrap();
    let sink = SvgReportSink::new(300);
    let path = dir.path().join("confusion_matrix.svg");

    let report = Evaluator::new(&sink)
        .evaluate(&clf, &x_test, &y_test, &path)
        .unwrap();

    assert!(report.accuracy > 0.85, "accuracy = {}", report.accuracy);
    assert_eq!(report.classes.len(), 2);
    assert_eq!(report.classes[1].support, 100);
    assert!(fs::read_to_string(&path).unwrap().contains("Confusion Matrix"));

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["macro_avg"]["support"], 400);
    assert_eq!(json["confusion"].as_array().unwrap().len(), 2);
}

#[test]
fn explanation_writes_all_four_charts() {
    let (clf, names) = trained();
    let (x_test, _, _) = make_data(3);
    let dir = TempDir::new().unwrap();
    let sink = SvgReportSink::default();

    let explainer = Explainer::new(&clf, &names).unwrap().with_max_rows(Some(50));
    let attributions = explainer.explain(&x_test).unwrap();
    assert_eq!(attributions.n_rows(), 50);

    let top = attributions.ranking(2);
    let top_names: Vec<&str> = top.iter().map(|&f| names[f].as_str()).collect();
    assert!(top_names.contains(&"pay_0"));
    assert!(top_names.contains(&"limit_bal"));

    let jobs: Vec<(ChartJob, PathBuf)> = ChartJob::ALL
        .iter()
        .map(|&job| (job, dir.path().join(format!("shap_{job}.svg"))))
        .collect();
    let outcomes = explainer.render(&attributions, &sink, &jobs, 15);

    assert!(outcomes.iter().all(|o| o.is_ok()), "{outcomes:?}");
    for (_, path) in &jobs {
        assert!(fs::read_to_string(path).unwrap().contains("<svg"));
    }
}

#[test]
fn unwritable_chart_is_recorded_not_fatal() {
    let (clf, names) = trained();
    let (x_test, _, _) = make_data(4);
    let dir = TempDir::new().unwrap();
    let explainer = Explainer::new(&clf, &names).unwrap();
    let attributions = explainer.explain(&x_test[..10]).unwrap();

    let jobs = vec![
        (ChartJob::Summary, dir.path().join("missing").join("summary.svg")),
        (ChartJob::Bar, dir.path().join("bar.svg")),
    ];
    let outcomes = explainer.render(&attributions, &SvgReportSink::default(), &jobs, 15);
    assert!(outcomes[0].error.is_some());
    assert!(outcomes[1].is_ok());
}
