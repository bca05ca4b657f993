//! Per-column standardization.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::PrepError;
use crate::matrix::FeatureMatrix;

/// Fitted per-column mean and standard deviation.
///
/// Uses the population standard deviation. Constant columns get a std of
/// 1.0, so they scale to zero instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardScaler {
    names: Vec<String>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Learn column statistics from `x`.
    ///
    /// # Errors
    ///
    /// [`PrepError::EmptyDataset`] when `x` has no rows.
    pub fn fit(x: &FeatureMatrix) -> Result<Self, PrepError> {
        let n = x.n_rows();
        if n == 0 {
            return Err(PrepError::EmptyDataset);
        }
        let n_cols = x.n_cols();

        let mut means = vec![0.0; n_cols];
        for row in x.rows() {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }

        let mut stds = vec![0.0; n_cols];
        for row in x.rows() {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m) * (v - m);
            }
        }
        for s in &mut stds {
            *s = (*s / n as f64).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self {
            names: x.names().to_vec(),
            means,
            stds,
        })
    }

    /// Fit on `x` and return the scaled matrix with the fitted state.
    ///
    /// # Errors
    ///
    /// Same as [`StandardScaler::fit`].
    #[instrument(skip_all, fields(n_rows = x.n_rows(), n_cols = x.n_cols()))]
    pub fn fit_transform(x: &FeatureMatrix) -> Result<(FeatureMatrix, Self), PrepError> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        debug!("scaler fitted");
        Ok((scaled, scaler))
    }

    /// Standardize `x` with the fitted statistics.
    ///
    /// # Errors
    ///
    /// [`PrepError::ColumnMismatch`] when column names or order differ from
    /// fit time.
    pub fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix, PrepError> {
        if x.names() != self.names.as_slice() {
            return Err(PrepError::ColumnMismatch {
                expected: self.names.clone(),
                got: x.names().to_vec(),
            });
        }
        let rows = x
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.stds))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();
        Ok(FeatureMatrix::from_parts(self.names.clone(), rows))
    }

    /// Column names seen at fit time.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Per-column means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-column standard deviations (constant columns report 1.0).
    #[must_use]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}
