use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use credit_risk_rf::{ClassWeight, RandomForestConfig};

/// 30 columns like the encoded credit table, with 22% defaults.
fn credit_like(n_rows: usize) -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let labels: Vec<usize> = (0..n_rows).map(|_| usize::from(rng.r#gen::<f64>() < 0.22)).collect();
    let rows = labels
        .iter()
        .map(|&class| {
            (0..30)
                .map(|c| (if c < 4 { 1.5 * class as f64 } else { 0.0 }) + rng.r#gen::<f64>())
                .collect()
        })
        .collect();
    (rows, labels, (0..30).map(|c| format!("x{c}")).collect())
}

fn forest(n_trees: usize) -> RandomForestConfig {
    RandomForestConfig::new(n_trees)
        .unwrap()
        .with_max_depth(Some(10))
        .with_class_weight(ClassWeight::Balanced)
}

fn train(c: &mut Criterion) {
    let (rows, labels, names) = credit_like(2000);
    let mut group = c.benchmark_group("train_2000x30");
    for n_trees in [1, 50] {
        let config = forest(n_trees);
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), &config, |b, config| {
            b.iter(|| config.fit(&rows, &labels, &names).unwrap());
        });
    }
    group.finish();
}

fn predict(c: &mut Criterion) {
    let (rows, labels, names) = credit_like(2000);
    let model = forest(50).fit(&rows, &labels, &names).unwrap().into_forest();
    c.bench_function("predict_proba_2000x30", |b| {
        b.iter(|| model.predict_proba_batch(&rows).unwrap());
    });
}

criterion_group!(benches, train, predict);
criterion_main!(benches);
