//! Impurity measures and the best-threshold search of one tree node.

use rand::Rng;
use rand::seq::index;

use crate::node::FeatureIndex;

/// Impurity measure minimized by the split search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCriterion {
    /// Gini impurity, `1 - sum(p^2)`.
    Gini,
    /// Shannon entropy in nats, `-sum(p ln p)`.
    Entropy,
}

impl SplitCriterion {
    /// Impurity of a node from its class-weighted counts; 0 for an empty node.
    #[must_use]
    pub fn impurity(self, counts: &[f64]) -> f64 {
        let total: f64 = counts.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let shares = counts.iter().map(|&c| c / total);
        let value = match self {
            SplitCriterion::Gini => 1.0 - shares.map(|p| p * p).sum::<f64>(),
            SplitCriterion::Entropy => -shares.filter(|&p| p > 0.0).map(|p| p * p.ln()).sum::<f64>(),
        };
        // A pure node can round to -0.0 or a tiny positive value.
        if value < 1e-15 { 0.0 } else { value }
    }
}

/// The winning threshold of a node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `W * I(parent) - W_l * I(left) - W_r * I(right)` over class-weighted mass.
    pub(crate) gain: f64,
}

/// Read-only inputs shared by every node of one tree.
pub(crate) struct Splitter<'a> {
    /// Column-major training values: `columns[feature][row]`.
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) class_weights: &'a [f64],
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl Splitter<'_> {
    /// Class-weighted label counts of `rows`; a repeated row counts each time.
    pub(crate) fn class_mass(&self, rows: &[usize]) -> Vec<f64> {
        let mut mass = vec![0.0; self.class_weights.len()];
        for &r in rows {
            let class = self.labels[r];
            mass[class] += self.class_weights[class];
        }
        mass
    }

    /// Best split of `rows` over `max_features` columns drawn without
    /// replacement.
    ///
    /// `None` when every drawn column is constant over `rows` or every
    /// threshold leaves fewer than `min_samples_leaf` rows on a side.
    pub(crate) fn best_split(&self, rows: &[usize], rng: &mut impl Rng) -> Option<Candidate> {
        let n_features = self.columns.len();
        if rows.len() < 2 || n_features == 0 {
            return None;
        }
        let parent = self.class_mass(rows);
        let parent_mass: f64 = parent.iter().sum();
        let parent_score = parent_mass * self.criterion.impurity(&parent);

        let drawn = index::sample(rng, n_features, self.max_features.min(n_features));
        let mut order = Vec::with_capacity(rows.len());
        let mut best: Option<Candidate> = None;
        for feature in drawn.iter() {
            let Some(candidate) = self.scan(feature, rows, &parent, parent_score, &mut order) else {
                continue;
            };
            if best.is_none_or(|b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Sweep the sorted values of one column, moving rows from right to left.
    fn scan(
        &self,
        feature: usize,
        rows: &[usize],
        parent: &[f64],
        parent_score: f64,
        order: &mut Vec<(f64, usize)>,
    ) -> Option<Candidate> {
        let column = &self.columns[feature];
        order.clear();
        order.extend(rows.iter().map(|&r| (column[r], r)));
        order.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let n = order.len();
        let mut left = vec![0.0; parent.len()];
        let mut right = parent.to_vec();
        let mut best: Option<(f64, f64)> = None;

        for (i, pair) in order.windows(2).enumerate() {
            let (value, row) = pair[0];
            let next = pair[1].0;
            let class = self.labels[row];
            let w = self.class_weights[class];
            left[class] += w;
            right[class] -= w;

            let n_left = i + 1;
            if value == next || n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                continue;
            }
            let left_mass: f64 = left.iter().sum();
            let right_mass: f64 = right.iter().sum();
            let gain = parent_score
                - left_mass * self.criterion.impurity(&left)
                - right_mass * self.criterion.impurity(&right);
            if best.is_none_or(|(g, _)| gain > g) {
                best = Some((gain, midpoint(value, next)));
            }
        }

        best.map(|(gain, threshold)| Candidate {
            feature: FeatureIndex::new(feature),
            threshold,
            gain,
        })
    }
}

/// Threshold between two adjacent sorted values. Rounding can land the
/// midpoint on `hi`, which would send `hi` left under `<=`.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = 0.5 * (lo + hi);
    if mid == hi { lo } else { mid }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn splitter<'a>(
        columns: &'a [Vec<f64>],
        labels: &'a [usize],
        class_weights: &'a [f64],
        min_samples_leaf: usize,
    ) -> Splitter<'a> {
        Splitter {
            columns,
            labels,
            class_weights,
            criterion: SplitCriterion::Gini,
            max_features: columns.len(),
            min_samples_leaf,
        }
    }

    #[test]
    fn impurity_of_known_counts() {
        assert_eq!(SplitCriterion::Gini.impurity(&[12.0, 0.0]), 0.0);
        assert!((SplitCriterion::Gini.impurity(&[3.0, 3.0]) - 0.5).abs() < 1e-12);
        assert!((SplitCriterion::Entropy.impurity(&[3.0, 3.0]) - 2.0_f64.ln()).abs() < 1e-12);
        assert_eq!(SplitCriterion::Entropy.impurity(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn finds_the_gap_between_classes() {
        // Repayment delay in months: defaulters are 2+ months late.
        let columns = vec![vec![5.0; 6], vec![-1.0, 0.0, 0.0, 2.0, 3.0, 2.0]];
        let labels = [0, 0, 0, 1, 1, 1];
        let s = splitter(&columns, &labels, &[1.0, 1.0], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let c = s.best_split(&[0, 1, 2, 3, 4, 5], &mut rng).unwrap();
        assert_eq!(c.feature.index(), 1);
        assert!((c.threshold - 1.0).abs() < f64::EPSILON);
        assert!((c.gain - 3.0).abs() < 1e-12);
    }

    #[test]
    fn constant_columns_cannot_split() {
        let columns = vec![vec![1.0; 4]];
        let s = splitter(&columns, &[0, 1, 0, 1], &[1.0, 1.0], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(s.best_split(&[0, 1, 2, 3], &mut rng).is_none());
    }

    #[test]
    fn leaf_minimum_blocks_small_sides() {
        let columns = vec![vec![0.0, 1.0, 2.0]];
        let s = splitter(&columns, &[0, 1, 1], &[1.0, 1.0], 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(s.best_split(&[0, 1, 2], &mut rng).is_none());
    }

    #[test]
    fn class_mass_counts_repeats_and_weights() {
        let columns = vec![vec![0.0; 3]];
        let s = splitter(&columns, &[0, 1, 1], &[0.6, 2.5], 1);
        let mass = s.class_mass(&[0, 0, 1, 2]);
        assert!((mass[0] - 1.2).abs() < 1e-12);
        assert!((mass[1] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn midpoint_of_adjacent_floats_stays_below_upper() {
        // An odd last mantissa bit makes the exact midpoint round up to `hi`.
        let lo = f64::from_bits(1.0_f64.to_bits() + 1);
        let hi = f64::from_bits(lo.to_bits() + 1);
        assert_eq!(0.5 * (lo + hi), hi);
        assert_eq!(midpoint(lo, hi), lo);
        assert!(midpoint(0.0, 2.0) == 1.0);
    }

    #[test]
    fn adjacent_values_split_as_scored() {
        let lo = f64::from_bits(1.0_f64.to_bits() + 1);
        let hi = f64::from_bits(lo.to_bits() + 1);
        let columns = vec![vec![lo, lo, hi, hi]];
        let s = splitter(&columns, &[0, 0, 1, 1], &[1.0, 1.0], 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let c = s.best_split(&[0, 1, 2, 3], &mut rng).unwrap();
        assert!(lo <= c.threshold && c.threshold < hi);
        assert!((c.gain - 2.0).abs() < 1e-12);
    }
}
