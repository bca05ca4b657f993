//! In-memory tabular data: ordered, typed, named columns.

use std::collections::HashSet;

use crate::IoError;

/// Normalize a column name: trim surrounding whitespace and lower-case.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Render a number the way it appears in category labels.
///
/// Integral values print without a fraction (`2.0` → `"2"`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Values of a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Every cell parsed as a finite number.
    Numeric(Vec<f64>),
    /// At least one cell was not a number.
    Text(Vec<String>),
}

impl ColumnData {
    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    /// Return `true` when the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row` as display text.
    #[must_use]
    pub fn display_value(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Numeric(v) => v.get(row).map(|&x| format_number(x)),
            ColumnData::Text(v) => v.get(row).cloned(),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Create a column. The name is normalized with [`normalize_name`].
    #[must_use]
    pub fn new(name: &str, data: ColumnData) -> Self {
        Self {
            name: normalize_name(name),
            data,
        }
    }

    /// Shorthand for a numeric column.
    #[must_use]
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    /// Shorthand for a text column.
    #[must_use]
    pub fn text(name: &str, values: Vec<String>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    /// Return the normalized column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column values.
    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Consume the column and return its values.
    #[must_use]
    pub fn into_data(self) -> ColumnData {
        self.data
    }

    /// Return the numeric values, or `None` for a text column.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Return `true` for a numeric column.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Return `true` when the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An ordered collection of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table from columns.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::DuplicateColumn`] | Two columns share a normalized name |
    /// | [`IoError::ColumnLength`] | Columns differ in length |
    pub fn new(columns: Vec<Column>) -> Result<Self, IoError> {
        let mut seen = HashSet::new();
        let n_rows = columns.first().map_or(0, Column::len);
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(IoError::DuplicateColumn {
                    column: col.name.clone(),
                });
            }
            if col.len() != n_rows {
                return Err(IoError::ColumnLength {
                    column: col.name.clone(),
                    expected: n_rows,
                    got: col.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by its normalized name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Remove the named column, returning the remaining table and the column.
    ///
    /// Returns `Err(self)` unchanged when no such column exists.
    pub fn split_off(self, name: &str) -> Result<(Table, Column), Table> {
        let Some(pos) = self.columns.iter().position(|c| c.name == name) else {
            return Err(self);
        };
        let mut columns = self.columns;
        let removed = columns.remove(pos);
        Ok((
            Table {
                columns,
                n_rows: self.n_rows,
            },
            removed,
        ))
    }
}
