//! Class-imbalance detection and SMOTE oversampling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::PrepError;
use crate::matrix::FeatureMatrix;

/// Count and share of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassShare {
    /// Class code.
    pub class: usize,
    /// Number of rows.
    pub count: usize,
    /// `count / total`.
    pub proportion: f64,
}

/// Result of [`ClassBalancer::balance`].
#[derive(Debug, Clone)]
pub struct Balanced {
    /// Original rows first, synthetic rows appended.
    pub x: FeatureMatrix,
    /// Labels aligned with `x`.
    pub y: Vec<usize>,
    /// Number of appended synthetic rows.
    pub n_synthetic: usize,
    /// Distribution before resampling.
    pub before: Vec<ClassShare>,
    /// Distribution after resampling.
    pub after: Vec<ClassShare>,
}

/// Oversamples minority classes with SMOTE when the data is imbalanced.
///
/// Data counts as imbalanced when the smallest class proportion is below
/// `threshold`. Every non-majority class is then grown to the majority count
/// with points `x_i + u * (x_nn - x_i)`, where `x_nn` is one of the
/// `k_neighbors` nearest same-class rows (Euclidean) and `u ~ U[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassBalancer {
    threshold: f64,
    k_neighbors: usize,
}

impl Default for ClassBalancer {
    fn default() -> Self {
        Self {
            threshold: 0.30,
            k_neighbors: 5,
        }
    }
}

impl ClassBalancer {
    /// Create a balancer with the given imbalance threshold and k = 5.
    ///
    /// # Errors
    ///
    /// [`PrepError::InvalidBalancer`] unless `0 < threshold <= 1`.
    pub fn new(threshold: f64) -> Result<Self, PrepError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(PrepError::InvalidBalancer {
                reason: format!("threshold must be in (0, 1], got {threshold}"),
            });
        }
        Ok(Self {
            threshold,
            ..Self::default()
        })
    }

    /// Set the number of neighbours used for interpolation.
    #[must_use]
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    /// Return the imbalance threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return the neighbour count.
    #[must_use]
    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Normalized distribution of the classes present in `y`.
    #[must_use]
    pub fn distribution(y: &[usize]) -> Vec<ClassShare> {
        let n_classes = y.iter().max().map_or(0, |&m| m + 1);
        let mut counts = vec![0usize; n_classes];
        for &label in y {
            counts[label] += 1;
        }
        let total = y.len().max(1) as f64;
        counts
            .into_iter()
            .enumerate()
            .filter(|&(_, count)| count > 0)
            .map(|(class, count)| ClassShare {
                class,
                count,
                proportion: count as f64 / total,
            })
            .collect()
    }

    /// Return `true` when the smallest class share is below the threshold.
    #[must_use]
    pub fn is_imbalanced(&self, y: &[usize]) -> bool {
        Self::distribution(y)
            .iter()
            .map(|s| s.proportion)
            .fold(f64::INFINITY, f64::min)
            < self.threshold
    }

    /// Resample `x`/`y` if imbalanced; otherwise return them unchanged.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::EmptyDataset`] | Zero rows |
    /// | [`PrepError::LengthMismatch`] | `y` length differs from row count |
    /// | [`PrepError::InvalidBalancer`] | `k_neighbors` is zero |
    /// | [`PrepError::InsufficientMinoritySamples`] | A class to resample has fewer than `k_neighbors + 1` rows |
    #[instrument(skip(self, x, y), fields(n_rows = x.n_rows()))]
    pub fn balance(&self, x: &FeatureMatrix, y: &[usize], seed: u64) -> Result<Balanced, PrepError> {
        if x.n_rows() == 0 {
            return Err(PrepError::EmptyDataset);
        }
        if y.len() != x.n_rows() {
            return Err(PrepError::LengthMismatch {
                n_rows: x.n_rows(),
                n_labels: y.len(),
            });
        }
        if self.k_neighbors == 0 {
            return Err(PrepError::InvalidBalancer {
                reason: "k_neighbors must be at least 1".into(),
            });
        }

        let before = Self::distribution(y);
        for share in &before {
            info!(
                class = share.class,
                count = share.count,
                proportion = share.proportion,
                "class distribution"
            );
        }

        if !self.is_imbalanced(y) {
            info!(threshold = self.threshold, "classes balanced enough, skipping SMOTE");
            return Ok(Balanced {
                x: x.clone(),
                y: y.to_vec(),
                n_synthetic: 0,
                after: before.clone(),
                before,
            });
        }

        let majority = before.iter().map(|s| s.count).max().unwrap_or(0);
        let required = self.k_neighbors + 1;
        if let Some(short) = before
            .iter()
            .find(|s| s.count < majority && s.count < required)
        {
            return Err(PrepError::InsufficientMinoritySamples {
                class: short.class,
                count: short.count,
                required,
            });
        }

        let mut rows = x.rows().to_vec();
        let mut labels = y.to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for share in before.iter().filter(|s| s.count < majority) {
            let members: Vec<&[f64]> = x
                .rows()
                .iter()
                .zip(y)
                .filter(|&(_, &label)| label == share.class)
                .map(|(row, _)| row.as_slice())
                .collect();
            let neighbors = nearest_neighbors(&members, self.k_neighbors);

            let n_new = majority - share.count;
            for _ in 0..n_new {
                let i = rng.gen_range(0..members.len());
                let nn = neighbors[i][rng.gen_range(0..self.k_neighbors)];
                let u: f64 = rng.r#gen();
                rows.push(interpolate(members[i], members[nn], u));
                labels.push(share.class);
            }
            debug!(class = share.class, n_new, "synthetic rows generated");
        }

        let n_synthetic = rows.len() - x.n_rows();
        let after = Self::distribution(&labels);
        info!(
            n_synthetic,
            n_rows = rows.len(),
            per_class = majority,
            "SMOTE applied"
        );

        Ok(Balanced {
            x: FeatureMatrix::from_parts(x.names().to_vec(), rows),
            y: labels,
            n_synthetic,
            before,
            after,
        })
    }
}

fn interpolate(a: &[f64], b: &[f64], u: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(ai, bi)| ai + u * (bi - ai)).collect()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(ai, bi)| (ai - bi) * (ai - bi)).sum()
}

/// Indices of the `k` nearest other points for every point.
///
/// Ties in distance break toward the lower index.
fn nearest_neighbors(points: &[&[f64]], k: usize) -> Vec<Vec<usize>> {
    (0..points.len())
        .into_par_iter()
        .map(|i| {
            let mut candidates: Vec<(f64, usize)> = points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, p)| (squared_distance(points[i], p), j))
                .collect();
            let cmp = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
            let k = k.min(candidates.len());
            if k > 0 && k < candidates.len() {
                candidates.select_nth_unstable_by(k - 1, cmp);
            }
            candidates.truncate(k);
            candidates.sort_by(cmp);
            candidates.into_iter().map(|(_, j)| j).collect()
        })
        .collect()
}
