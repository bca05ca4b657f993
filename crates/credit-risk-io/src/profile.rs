//! Dataset profiling: per-column summaries and likely target columns.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::table::{Column, ColumnData, Table, format_number};

/// Columns with this many distinct values (inclusive) look like class labels.
const TARGET_CARDINALITY: std::ops::RangeInclusive<usize> = 2..=5;

/// Summary of one column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    /// Normalized column name.
    pub name: String,
    /// `"numeric"` or `"text"`.
    pub kind: &'static str,
    /// Number of distinct values.
    pub n_unique: usize,
    /// First value of the column.
    pub sample: String,
}

/// A column that could serve as a classification target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetCandidate {
    /// Normalized column name.
    pub name: String,
    /// `(value, count)` pairs in ascending value order.
    pub counts: Vec<(String, usize)>,
}

/// Shape, column summaries, and candidate targets of a table.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// One profile per column, in table order.
    pub columns: Vec<ColumnProfile>,
    /// Columns with 2 to 5 distinct values.
    pub candidate_targets: Vec<TargetCandidate>,
}

/// Distinct values of a column with their counts.
///
/// Numeric columns are ordered numerically, text columns lexically.
#[must_use]
pub fn value_counts(column: &Column) -> Vec<(String, usize)> {
    match column.data() {
        ColumnData::Numeric(values) => {
            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            let mut counts: Vec<(f64, usize)> = Vec::new();
            for v in sorted {
                match counts.last_mut() {
                    Some((last, n)) if *last == v => *n += 1,
                    _ => counts.push((v, 1)),
                }
            }
            counts
                .into_iter()
                .map(|(v, n)| (format_number(v), n))
                .collect()
        }
        ColumnData::Text(values) => {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for v in values {
                *counts.entry(v.as_str()).or_default() += 1;
            }
            counts
                .into_iter()
                .map(|(v, n)| (v.to_string(), n))
                .collect()
        }
    }
}

/// Profile every column of `table`.
#[must_use]
pub fn profile(table: &Table) -> DatasetProfile {
    let mut columns = Vec::with_capacity(table.n_cols());
    let mut candidate_targets = Vec::new();

    for column in table.columns() {
        let counts = value_counts(column);
        columns.push(ColumnProfile {
            name: column.name().to_string(),
            kind: if column.is_numeric() { "numeric" } else { "text" },
            n_unique: counts.len(),
            sample: column.data().display_value(0).unwrap_or_default(),
        });
        if TARGET_CARDINALITY.contains(&counts.len()) {
            candidate_targets.push(TargetCandidate {
                name: column.name().to_string(),
                counts,
            });
        }
    }

    DatasetProfile {
        n_rows: table.n_rows(),
        n_cols: table.n_cols(),
        columns,
        candidate_targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("id", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Column::numeric("sex", vec![2.0, 1.0, 2.0, 2.0, 1.0, 2.0]),
            Column::text(
                "grade",
                ["b", "a", "c", "a", "b", "a"].iter().map(|s| (*s).to_string()).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn numeric_counts_ascending() {
        let t = table();
        let counts = value_counts(t.column("sex").unwrap());
        assert_eq!(counts, vec![("1".to_string(), 2), ("2".to_string(), 4)]);
    }

    #[test]
    fn text_counts_lexical() {
        let t = table();
        let counts = value_counts(t.column("grade").unwrap());
        assert_eq!(counts[0], ("a".to_string(), 3));
        assert_eq!(counts[2], ("c".to_string(), 1));
    }

    #[test]
    fn candidates_exclude_high_cardinality() {
        let p = profile(&table());
        assert_eq!((p.n_rows, p.n_cols), (6, 3));
        let names: Vec<&str> = p.candidate_targets.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["sex", "grade"]);
        assert_eq!(p.columns[0].n_unique, 6);
        assert_eq!(p.columns[2].kind, "text");
        assert_eq!(p.columns[1].sample, "2");
    }
}
