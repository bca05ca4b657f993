//! Target extraction and class-code mapping.

use std::collections::BTreeSet;

use credit_risk_io::{ColumnData, Table, format_number, normalize_name};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::PrepError;

/// How raw target values map to class codes.
///
/// Numeric targets are coded by ascending value, so a 0/1 column maps to
/// itself. Text targets are coded by lexical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetEncoding {
    column: String,
    labels: Vec<String>,
}

impl TargetEncoding {
    /// Normalized target column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Raw value for each class code, indexed by code.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Raw value for one class code.
    #[must_use]
    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }
}

/// Remove the target column from `table` and code its values.
///
/// `target` is normalized like every column name before lookup. Returns the
/// remaining feature table, one class code per row, and the code mapping.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PrepError::TargetColumnMissing`] | No column with that name |
/// | [`PrepError::TooFewClasses`] | Fewer than two distinct target values |
#[instrument(skip(table), fields(n_rows = table.n_rows()))]
pub fn split_target(
    table: Table,
    target: &str,
) -> Result<(Table, Vec<usize>, TargetEncoding), PrepError> {
    let column = normalize_name(target);
    let (features, target_col) = table.split_off(&column).map_err(|t| PrepError::TargetColumnMissing {
        column: column.clone(),
        available: t.column_names(),
    })?;

    let (codes, labels) = match target_col.into_data() {
        ColumnData::Numeric(values) => code_numeric(&values),
        ColumnData::Text(values) => code_text(&values),
    };
    if labels.len() < 2 {
        return Err(PrepError::TooFewClasses {
            column,
            n_classes: labels.len(),
        });
    }
    debug!(n_classes = labels.len(), ?labels, "target coded");

    Ok((features, codes, TargetEncoding { column, labels }))
}

fn code_numeric(values: &[f64]) -> (Vec<usize>, Vec<String>) {
    let mut distinct = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    let codes = values
        .iter()
        .map(|v| distinct.partition_point(|d| d.total_cmp(v).is_lt()))
        .collect();
    (codes, distinct.into_iter().map(format_number).collect())
}

fn code_text(values: &[String]) -> (Vec<usize>, Vec<String>) {
    let distinct: Vec<String> = values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let codes = values
        .iter()
        .map(|v| distinct.partition_point(|d| d < v))
        .collect();
    (codes, distinct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use credit_risk_io::Column;

    fn table(target: Column) -> Table {
        Table::new(vec![Column::numeric("limit_bal", vec![1.0, 2.0, 3.0]), target]).unwrap()
    }

    #[test]
    fn numeric_zero_one_maps_to_itself() {
        let t = table(Column::numeric("Default Payment Next Month", vec![1.0, 0.0, 1.0]));
        let (features, y, enc) = split_target(t, " DEFAULT payment next month").unwrap();
        assert_eq!(y, vec![1, 0, 1]);
        assert_eq!(enc.labels(), &["0", "1"]);
        assert_eq!(features.column_names(), vec!["limit_bal"]);
    }

    #[test]
    fn text_target_is_lexical() {
        let t = table(Column::text("status", vec!["yes".into(), "no".into(), "maybe".into()]));
        let (_, y, enc) = split_target(t, "status").unwrap();
        assert_eq!(enc.labels(), &["maybe", "no", "yes"]);
        assert_eq!(y, vec![2, 1, 0]);
        assert_eq!(enc.label(1), Some("no"));
    }

    #[test]
    fn missing_target_lists_columns() {
        let t = table(Column::numeric("y", vec![0.0, 1.0, 0.0]));
        let err = split_target(t, "default").unwrap_err();
        match err {
            PrepError::TargetColumnMissing { column, available } => {
                assert_eq!(column, "default");
                assert_eq!(available, vec!["limit_bal", "y"]);
            }
            other => panic!("expected TargetColumnMissing, got {other:?}"),
        }
    }

    #[test]
    fn single_class_rejected() {
        let t = table(Column::numeric("y", vec![1.0, 1.0, 1.0]));
        assert!(matches!(
            split_target(t, "y"),
            Err(PrepError::TooFewClasses { n_classes: 1, .. })
        ));
    }
}
