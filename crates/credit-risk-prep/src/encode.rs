//! Drop-first one-hot encoding with a replayable column layout.

use std::collections::{BTreeSet, HashMap};

use credit_risk_io::{Column, ColumnData, Table, format_number, normalize_name};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::PrepError;
use crate::matrix::FeatureMatrix;

/// Expands designated categorical columns into indicator columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalEncoder {
    columns: Vec<String>,
}

impl CategoricalEncoder {
    /// Create an encoder for the given categorical column names.
    ///
    /// Names are normalized like table columns. Listed columns absent from
    /// the table are skipped at fit time.
    #[must_use]
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| normalize_name(c.as_ref())).collect(),
        }
    }

    /// Learn the category layout of `table`.
    ///
    /// Passthrough columns keep their order and come first; one block of
    /// dummies per categorical column follows, in the order given to
    /// [`CategoricalEncoder::new`]. Each block drops its first category
    /// (numeric order for numeric columns, lexical for text).
    ///
    /// # Errors
    ///
    /// [`PrepError::NonNumericFeature`] when a passthrough column is text.
    #[instrument(skip_all, fields(n_cols = table.n_cols()))]
    pub fn fit(&self, table: &Table) -> Result<Encoding, PrepError> {
        let mut passthrough = Vec::new();
        for col in table.columns() {
            if self.columns.iter().any(|c| c == col.name()) {
                continue;
            }
            if !col.is_numeric() {
                return Err(PrepError::NonNumericFeature {
                    column: col.name().to_string(),
                });
            }
            passthrough.push(col.name().to_string());
        }

        let blocks: Vec<DummyBlock> = self
            .columns
            .iter()
            .filter_map(|name| table.column(name))
            .map(DummyBlock::fit)
            .collect();

        let mut feature_names = passthrough.clone();
        for block in &blocks {
            feature_names.extend(block.dummy_names());
        }

        if blocks.is_empty() {
            debug!("no categorical columns present");
        } else {
            info!(
                n_categorical = blocks.len(),
                n_dummies = feature_names.len() - passthrough.len(),
                n_features = feature_names.len(),
                "categorical columns one-hot encoded"
            );
        }

        Ok(Encoding {
            source_names: table.column_names(),
            passthrough,
            blocks,
            feature_names,
        })
    }

    /// Fit on `table` and encode it in one step.
    ///
    /// # Errors
    ///
    /// Same as [`CategoricalEncoder::fit`].
    pub fn fit_transform(&self, table: &Table) -> Result<(FeatureMatrix, Encoding), PrepError> {
        let encoding = self.fit(table)?;
        let matrix = encoding.transform(table)?;
        Ok((matrix, encoding))
    }
}

/// Dummy columns derived from one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DummyBlock {
    column: String,
    dropped: Option<String>,
    kept: Vec<String>,
}

impl DummyBlock {
    fn fit(column: &Column) -> Self {
        let mut categories = categories_of(column.data()).into_iter();
        let dropped = categories.next();
        Self {
            column: column.name().to_string(),
            dropped,
            kept: categories.collect(),
        }
    }

    /// Source column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Baseline category encoded as all zeros.
    #[must_use]
    pub fn dropped(&self) -> Option<&str> {
        self.dropped.as_deref()
    }

    /// Categories that each get an indicator column, in order.
    #[must_use]
    pub fn kept(&self) -> &[String] {
        &self.kept
    }

    fn dummy_names(&self) -> impl Iterator<Item = String> + '_ {
        self.kept.iter().map(|c| format!("{}_{c}", self.column))
    }
}

fn categories_of(data: &ColumnData) -> Vec<String> {
    match data {
        ColumnData::Numeric(values) => {
            let mut distinct = values.clone();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            distinct.into_iter().map(format_number).collect()
        }
        ColumnData::Text(values) => values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}

/// A fitted column layout that replays on later tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Encoding {
    source_names: Vec<String>,
    passthrough: Vec<String>,
    blocks: Vec<DummyBlock>,
    feature_names: Vec<String>,
}

impl Encoding {
    /// Feature column names before expansion.
    #[must_use]
    pub fn source_names(&self) -> &[String] {
        &self.source_names
    }

    /// Encoded column names, in matrix order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Dummy blocks in encoded order.
    #[must_use]
    pub fn blocks(&self) -> &[DummyBlock] {
        &self.blocks
    }

    /// Encode `table` with the fitted layout.
    ///
    /// Unseen categories, and the dropped baseline, encode as all zeros.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::ColumnMismatch`] | Column names or order differ from fit time |
    /// | [`PrepError::NonNumericFeature`] | A passthrough column is text |
    pub fn transform(&self, table: &Table) -> Result<FeatureMatrix, PrepError> {
        let got = table.column_names();
        if got != self.source_names {
            return Err(PrepError::ColumnMismatch {
                expected: self.source_names.clone(),
                got,
            });
        }

        let mut numeric: Vec<&[f64]> = Vec::with_capacity(self.passthrough.len());
        for name in &self.passthrough {
            let values = table
                .column(name)
                .and_then(Column::as_numeric)
                .ok_or_else(|| PrepError::NonNumericFeature {
                    column: name.clone(),
                })?;
            numeric.push(values);
        }

        let lookups: Vec<(&ColumnData, HashMap<&str, usize>)> = self
            .blocks
            .iter()
            .filter_map(|block| {
                let data = table.column(&block.column)?.data();
                let index = block
                    .kept
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.as_str(), i))
                    .collect();
                Some((data, index))
            })
            .collect();

        let rows = (0..table.n_rows())
            .map(|r| {
                let mut row: Vec<f64> = numeric.iter().map(|col| col[r]).collect();
                for (block, (data, index)) in self.blocks.iter().zip(&lookups) {
                    let start = row.len();
                    row.resize(start + block.kept.len(), 0.0);
                    if let Some(value) = data.display_value(r)
                        && let Some(&i) = index.get(value.as_str())
                    {
                        row[start + i] = 1.0;
                    }
                }
                row
            })
            .collect();

        Ok(FeatureMatrix::from_parts(self.feature_names.clone(), rows))
    }
}
