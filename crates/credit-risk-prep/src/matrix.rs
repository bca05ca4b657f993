//! Named, row-major numeric feature matrix.

use serde::Serialize;

use crate::PrepError;

/// Row-major `f64` matrix with one name per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, checking every row against the name count.
    ///
    /// # Errors
    ///
    /// [`PrepError::ColumnMismatch`] when a row has a different width than
    /// `names`.
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, PrepError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(PrepError::ColumnMismatch {
                expected: names.clone(),
                got: (0..bad.len()).map(|i| format!("#{i}")).collect(),
            });
        }
        Ok(Self { names, rows })
    }

    /// Column names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Consume the matrix and return its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    /// Values of one column.
    #[must_use]
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[index]).collect()
    }

    /// A new matrix with only the given rows, in the given order.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub(crate) fn from_parts(names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        Self { names, rows }
    }
}
