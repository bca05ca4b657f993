//! Held-out confusion counts and the per-class scores derived from them.

use std::fmt;

use serde::Serialize;

use crate::error::RfError;

/// Counts of `(actual, predicted)` class pairs.
///
/// Row `a`, column `p` holds the rows whose true class is `a` and whose
/// predicted class is `p`. Diagonal cells are hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    cells: Vec<Vec<usize>>,
}

/// Scores of one class against all others.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    /// Class code.
    pub class: usize,
    /// Hits over everything predicted as this class; 0.0 when nothing was.
    pub precision: f64,
    /// Hits over everything truly in this class; 0.0 for an empty class.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// Rows truly in this class.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// Tally `actual` against `predicted` over `n_classes` classes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | No labels |
    /// | [`RfError::LabelCountMismatch`] | The slices differ in length |
    /// | [`RfError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        actual: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if actual.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if actual.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_features_rows: predicted.len(),
                n_labels: actual.len(),
            });
        }

        let mut cells = vec![vec![0; n_classes]; n_classes];
        for (sample_index, pair) in actual.iter().zip(predicted).enumerate() {
            match pair {
                (&a, &p) if a < n_classes && p < n_classes => cells[a][p] += 1,
                (&a, &p) => {
                    return Err(RfError::LabelOutOfRange {
                        label: a.max(p),
                        n_classes,
                        sample_index,
                    });
                }
            }
        }
        Ok(Self { cells })
    }

    /// Number of tallied rows.
    #[must_use]
    pub fn total(&self) -> usize {
        self.cells.iter().map(|row| row.iter().sum::<usize>()).sum()
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.cells.len()
    }

    fn hits(&self, class: usize) -> usize {
        self.cells[class][class]
    }

    fn actual_count(&self, class: usize) -> usize {
        self.cells[class].iter().sum()
    }

    fn predicted_count(&self, class: usize) -> usize {
        self.cells.iter().map(|row| row[class]).sum()
    }

    /// Share of rows on the diagonal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let hits = (0..self.n_classes()).map(|c| self.hits(c)).sum();
        ratio(hits, self.total())
    }

    /// Precision, recall, F1 and support for every class, by class code.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes())
            .map(|class| {
                let support = self.actual_count(class);
                let precision = ratio(self.hits(class), self.predicted_count(class));
                let recall = ratio(self.hits(class), support);
                let denom = precision + recall;
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1: if denom > 0.0 { 2.0 * precision * recall / denom } else { 0.0 },
                    support,
                }
            })
            .collect()
    }

    /// Rows of the matrix, indexed `[actual][predicted]`.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.cells
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actual\\pred")?;
        for p in 0..self.n_classes() {
            write!(f, " {p:>8}")?;
        }
        writeln!(f)?;
        for (a, row) in self.cells.iter().enumerate() {
            write!(f, "{a:>11}")?;
            for count in row {
                write!(f, " {count:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
