//! Stratified train/test partitioning.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::PrepError;
use crate::matrix::FeatureMatrix;

/// Disjoint train and test partitions of one dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// Training features.
    pub x_train: FeatureMatrix,
    /// Test features.
    pub x_test: FeatureMatrix,
    /// Training labels.
    pub y_train: Vec<usize>,
    /// Test labels.
    pub y_test: Vec<usize>,
}

/// Split rows into train and test, preserving class proportions.
///
/// The test partition holds `ceil(test_size * n)` rows. Per-class test counts
/// are allocated proportionally with largest-remainder rounding, and rows are
/// drawn after a seeded shuffle within each class. Both partitions keep the
/// original relative row order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PrepError::EmptyDataset`] | Zero rows |
/// | [`PrepError::LengthMismatch`] | `y` length differs from row count |
/// | [`PrepError::InvalidSplitSize`] | `test_size` outside (0, 1), or a class would be missing from a partition |
#[instrument(skip(x, y), fields(n_rows = x.n_rows()))]
pub fn stratified_split(
    x: &FeatureMatrix,
    y: &[usize],
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit, PrepError> {
    let n = x.n_rows();
    if n == 0 {
        return Err(PrepError::EmptyDataset);
    }
    if y.len() != n {
        return Err(PrepError::LengthMismatch {
            n_rows: n,
            n_labels: y.len(),
        });
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PrepError::InvalidSplitSize {
            test_size,
            reason: "must be strictly between 0 and 1".into(),
        });
    }

    let n_classes = y.iter().max().copied().unwrap_or(0) + 1;
    let mut class_indices: Vec<Vec<usize>> = vec![vec![]; n_classes];
    for (i, &label) in y.iter().enumerate() {
        class_indices[label].push(i);
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let counts: Vec<usize> = class_indices.iter().map(Vec::len).collect();
    let test_counts = allocate(&counts, n_test, n);

    for (class, (&count, &t)) in counts.iter().zip(&test_counts).enumerate() {
        if count > 0 && (t == 0 || t == count) {
            return Err(PrepError::InvalidSplitSize {
                test_size,
                reason: format!(
                    "class {class} with {count} rows would get {t} test and {} train rows",
                    count - t
                ),
            });
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_idx = Vec::with_capacity(n - n_test);
    let mut test_idx = Vec::with_capacity(n_test);
    for (indices, &t) in class_indices.iter_mut().zip(&test_counts) {
        indices.shuffle(&mut rng);
        test_idx.extend_from_slice(&indices[..t]);
        train_idx.extend_from_slice(&indices[t..]);
    }
    train_idx.sort_unstable();
    test_idx.sort_unstable();

    debug!(
        n_train = train_idx.len(),
        n_test = test_idx.len(),
        ?test_counts,
        "stratified split"
    );

    Ok(TrainTestSplit {
        x_train: x.select_rows(&train_idx),
        x_test: x.select_rows(&test_idx),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
    })
}

/// Share `total` among classes in proportion to `counts` (largest remainder).
fn allocate(counts: &[usize], total: usize, n: usize) -> Vec<usize> {
    let mut shares: Vec<usize> = counts.iter().map(|&c| c * total / n).collect();
    let assigned: usize = shares.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] > 0).collect();
    // Remainder of c * total / n, scaled by n; ties go to the lower class.
    order.sort_by_key(|&c| std::cmp::Reverse((counts[c] * total) % n));
    for &c in order.iter().take(total.saturating_sub(assigned)) {
        shares[c] += 1;
    }
    shares
}
