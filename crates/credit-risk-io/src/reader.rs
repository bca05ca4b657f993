//! Delimited-text and spreadsheet dataset reader with full input validation.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{Data, Ods, Range, Reader, Xls, Xlsb, Xlsx, open_workbook};
use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::table::{Column, ColumnData, Table, format_number, normalize_name};

/// Where the header sits in a worksheet and whether to drop an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpreadsheetLayout {
    /// Zero-based row holding the column names; rows above it are skipped.
    pub header_row: usize,
    /// Drop the first column (a row index) after reading.
    pub drop_index_column: bool,
}

/// A spreadsheet parser backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetEngine {
    /// Legacy binary workbook (BIFF, `.xls`).
    Xls,
    /// Office Open XML workbook (`.xlsx`, `.xlsm`).
    Xlsx,
    /// Binary Office Open XML workbook (`.xlsb`).
    Xlsb,
    /// OpenDocument spreadsheet (`.ods`).
    Ods,
}

impl SpreadsheetEngine {
    /// Engines to try for an extension, in order.
    ///
    /// Workbooks are often saved with the wrong extension, so the binary
    /// and XML engines fall back to each other.
    #[must_use]
    pub fn candidates(extension: &str) -> &'static [SpreadsheetEngine] {
        use SpreadsheetEngine::{Ods, Xls, Xlsb, Xlsx};
        match extension {
            "xls" => &[Xls, Xlsx],
            "xlsx" | "xlsm" => &[Xlsx, Xls],
            "xlsb" => &[Xlsb, Xlsx],
            "ods" => &[Ods],
            _ => &[],
        }
    }

    fn first_sheet(self, path: &Path) -> Result<Range<Data>, String> {
        match self {
            SpreadsheetEngine::Xls => first_sheet_of::<Xls<_>>(path),
            SpreadsheetEngine::Xlsx => first_sheet_of::<Xlsx<_>>(path),
            SpreadsheetEngine::Xlsb => first_sheet_of::<Xlsb<_>>(path),
            SpreadsheetEngine::Ods => first_sheet_of::<Ods<_>>(path),
        }
    }
}

impl fmt::Display for SpreadsheetEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpreadsheetEngine::Xls => "xls",
            SpreadsheetEngine::Xlsx => "xlsx",
            SpreadsheetEngine::Xlsb => "xlsb",
            SpreadsheetEngine::Ods => "ods",
        };
        f.write_str(name)
    }
}

fn first_sheet_of<R>(path: &Path) -> Result<Range<Data>, String>
where
    R: Reader<BufReader<File>>,
    R::Error: fmt::Display,
{
    let mut workbook: R = open_workbook::<R, _>(path).map_err(|e| e.to_string())?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;
    workbook.worksheet_range(&sheet).map_err(|e| e.to_string())
}

/// A parsed cell before column typing.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) if f.is_finite() => Cell::Number(*f),
            Data::String(s) => Cell::parse(s),
            other => Cell::Text(other.to_string()),
        }
    }

    fn into_text(self) -> String {
        match self {
            Cell::Number(v) => format_number(v),
            Cell::Text(s) => s,
            Cell::Empty => String::new(),
        }
    }
}

/// Input format resolved from the file extension.
#[derive(Debug, Clone, Copy)]
enum Format {
    Delimited(u8),
    Spreadsheet(&'static [SpreadsheetEngine]),
}

/// Reads a tabular dataset into a [`Table`].
///
/// Supported extensions (case-insensitive):
/// - `csv`, `txt`: comma-delimited text, header on the first line
/// - `tsv`: tab-delimited text
/// - `xls`, `xlsx`, `xlsm`, `xlsb`, `ods`: first worksheet, laid out per
///   [`SpreadsheetLayout`]
///
/// Column names are trimmed and lower-cased. A column is numeric when every
/// cell is a finite number, otherwise text.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::UnsupportedFormat`] | Unknown extension |
/// | [`IoError::CsvParse`] | Malformed delimited record |
/// | [`IoError::SpreadsheetParse`] | Every spreadsheet engine failed |
/// | [`IoError::EmptyDataset`] | Zero data rows after the header |
/// | [`IoError::InconsistentRowLength`] | Row has a different cell count than the header |
/// | [`IoError::MissingValue`] | A cell is empty |
/// | [`IoError::DuplicateColumn`] | Two names collide after normalization |
pub struct DatasetReader {
    path: PathBuf,
    layout: SpreadsheetLayout,
}

impl DatasetReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            layout: SpreadsheetLayout::default(),
        }
    }

    /// Set the worksheet layout used for spreadsheet formats.
    #[must_use]
    pub fn with_layout(mut self, layout: SpreadsheetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Read and validate the file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let format = self.format()?;
        std::fs::metadata(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let (header, rows) = match format {
            Format::Delimited(delimiter) => self.read_delimited(delimiter)?,
            Format::Spreadsheet(engines) => self.read_spreadsheet(engines)?,
        };
        let table = self.build_table(header, rows)?;

        info!(
            n_rows = table.n_rows(),
            n_cols = table.n_cols(),
            "dataset loaded"
        );
        Ok(table)
    }

    fn format(&self) -> Result<Format, IoError> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" | "txt" => Ok(Format::Delimited(b',')),
            "tsv" => Ok(Format::Delimited(b'\t')),
            ext => {
                let engines = SpreadsheetEngine::candidates(ext);
                if engines.is_empty() {
                    Err(IoError::UnsupportedFormat {
                        path: self.path.clone(),
                        extension,
                    })
                } else {
                    Ok(Format::Spreadsheet(engines))
                }
            }
        }
    }

    fn read_delimited(&self, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<Cell>>), IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets InconsistentRowLength fire instead of a CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(str::to_string)
            .collect();
        debug!(n_cols = header.len(), "read delimited header");

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.csv_error(e))?;
            rows.push(record.iter().map(Cell::parse).collect());
        }
        Ok((header, rows))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn read_spreadsheet(
        &self,
        engines: &[SpreadsheetEngine],
    ) -> Result<(Vec<String>, Vec<Vec<Cell>>), IoError> {
        let mut attempts = Vec::new();
        let mut sheet = None;
        for &engine in engines {
            match engine.first_sheet(&self.path) {
                Ok(range) => {
                    debug!(%engine, "spreadsheet parsed");
                    sheet = Some(range);
                    break;
                }
                Err(reason) => {
                    warn!(%engine, %reason, "spreadsheet engine failed");
                    attempts.push(format!("{engine}: {reason}"));
                }
            }
        }
        let Some(range) = sheet else {
            return Err(IoError::SpreadsheetParse {
                path: self.path.clone(),
                attempts,
            });
        };

        // The range starts at the first non-empty cell, not at A1.
        let start_row = range.start().map_or(0, |(r, _)| r as usize);
        let skip = self.layout.header_row.saturating_sub(start_row);
        let mut sheet_rows = range.rows().skip(skip);

        let header: Vec<String> = sheet_rows
            .next()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, cell)| match Cell::from_data(cell) {
                        Cell::Empty => format!("unnamed_{i}"),
                        other => other.into_text(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows: Vec<Vec<Cell>> = sheet_rows
            .map(|row| row.iter().map(Cell::from_data).collect::<Vec<_>>())
            .filter(|cells| cells.iter().any(|c| *c != Cell::Empty))
            .collect();
        Ok((header, rows))
    }

    /// Type every column and assemble the table.
    fn build_table(&self, mut header: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Result<Table, IoError> {
        let is_spreadsheet = matches!(self.format()?, Format::Spreadsheet(_));
        if is_spreadsheet && self.layout.drop_index_column && !header.is_empty() {
            header.remove(0);
            for row in &mut rows {
                if !row.is_empty() {
                    row.remove(0);
                }
            }
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let names: Vec<String> = header.iter().map(|h| normalize_name(h)).collect();
        let n_cols = names.len();

        let mut columns: Vec<Vec<Cell>> = vec![Vec::with_capacity(rows.len()); n_cols];
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: n_cols,
                    got: row.len(),
                });
            }
            for (col_index, cell) in row.into_iter().enumerate() {
                if cell == Cell::Empty {
                    return Err(IoError::MissingValue {
                        path: self.path.clone(),
                        row_index,
                        column: names[col_index].clone(),
                    });
                }
                columns[col_index].push(cell);
            }
        }

        let typed: Vec<Column> = names
            .iter()
            .zip(columns)
            .map(|(name, cells)| Column::new(name, type_cells(cells)))
            .collect();
        Table::new(typed)
    }
}

fn type_cells(cells: Vec<Cell>) -> ColumnData {
    if cells.iter().all(|c| matches!(c, Cell::Number(_))) {
        ColumnData::Numeric(
            cells
                .into_iter()
                .filter_map(|c| match c {
                    Cell::Number(v) => Some(v),
                    _ => None,
                })
                .collect(),
        )
    } else {
        ColumnData::Text(cells.into_iter().map(Cell::into_text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut f = Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_csv_preserves_rows_and_normalizes_names() {
        let f = write_file(
            ".csv",
            " LIMIT_BAL ,Sex,Default Payment Next Month\n20000,2,1\n120000,2,1\n90000,1,0\n",
        );
        let table = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(
            table.column_names(),
            vec!["limit_bal", "sex", "default payment next month"]
        );
        assert_eq!(
            table.column("limit_bal").unwrap().as_numeric().unwrap(),
            &[20000.0, 120000.0, 90000.0]
        );
    }

    #[test]
    fn mixed_column_becomes_text() {
        let f = write_file(".csv", "grade,score\nA,1\n2,2\n");
        let table = DatasetReader::new(f.path()).read().unwrap();
        let grade = table.column("grade").unwrap();
        assert!(!grade.is_numeric());
        assert_eq!(grade.data().display_value(1).as_deref(), Some("2"));
        assert!(table.column("score").unwrap().is_numeric());
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let f = write_file(".tsv", "a\tb\n1\t2\n");
        let table = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn unsupported_extension() {
        let f = write_file(".parquet", "x");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat { extension, .. } if extension == "parquet"));
    }

    #[test]
    fn file_not_found() {
        let err = DatasetReader::new(Path::new("/nonexistent/credit.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn header_only_is_empty() {
        let f = write_file(".csv", "a,b\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn short_row_is_inconsistent() {
        let f = write_file(".csv", "a,b\n1,2\n3\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength {
                row_index: 1,
                expected: 2,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn empty_cell_is_missing_value() {
        let f = write_file(".csv", "a,b\n1,2\n3, \n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::MissingValue { row_index: 1, column, .. } if column == "b"
        ));
    }

    #[test]
    fn duplicate_names_after_normalization() {
        let f = write_file(".csv", "Age,age \n1,2\n");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { .. }));
    }

    #[test]
    fn corrupt_workbook_reports_every_engine() {
        let f = write_file(".xls", "this is not a workbook");
        let err = DatasetReader::new(f.path()).read().unwrap_err();
        match err {
            IoError::SpreadsheetParse { attempts, .. } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("xls:"));
                assert!(attempts[1].starts_with("xlsx:"));
            }
            other => panic!("expected SpreadsheetParse, got {other:?}"),
        }
    }

    #[test]
    fn engine_candidates_fall_back() {
        assert_eq!(
            SpreadsheetEngine::candidates("xls"),
            &[SpreadsheetEngine::Xls, SpreadsheetEngine::Xlsx]
        );
        assert_eq!(
            SpreadsheetEngine::candidates("xlsm"),
            &[SpreadsheetEngine::Xlsx, SpreadsheetEngine::Xls]
        );
        assert!(SpreadsheetEngine::candidates("json").is_empty());
    }

    #[test]
    fn spreadsheet_cells_convert() {
        assert_eq!(Cell::from_data(&Data::Int(3)), Cell::Number(3.0));
        assert_eq!(Cell::from_data(&Data::String(" 4.5 ".into())), Cell::Number(4.5));
        assert_eq!(Cell::from_data(&Data::String("male".into())), Cell::Text("male".into()));
        assert_eq!(Cell::from_data(&Data::Empty), Cell::Empty);
    }

    /// Credit-card workbook layout: a code row above the header and an
    /// `ID` column first.
    fn write_credit_workbook(path: &Path) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, code) in [(1u16, "X1"), (2, "X2"), (3, "Y")] {
            sheet.write_string(0, col, code).unwrap();
        }
        for (col, name) in ["ID", " LIMIT_BAL", "SEX", "default payment next month"].iter().enumerate() {
            sheet.write_string(1, col as u16, *name).unwrap();
        }
        let rows = [
            [1.0, 20000.0, 2.0, 1.0],
            [2.0, 120000.0, 2.0, 1.0],
            [3.0, 90000.0, 1.0, 0.0],
            [4.0, 50000.0, 1.0, 0.0],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                sheet.write_number(r as u32 + 2, c as u16, v).unwrap();
            }
        }
        workbook.save(path).unwrap();
    }

    fn credit_layout() -> SpreadsheetLayout {
        SpreadsheetLayout {
            header_row: 1,
            drop_index_column: true,
        }
    }

    #[test]
    fn workbook_header_row_and_index_column() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("credit.xlsx");
        write_credit_workbook(&path);

        let table = DatasetReader::new(&path).with_layout(credit_layout()).read().unwrap();
        assert_eq!(
            table.column_names(),
            vec!["limit_bal", "sex", "default payment next month"]
        );
        assert_eq!(table.n_rows(), 4);
        assert_eq!(
            table.column("limit_bal").unwrap().as_numeric().unwrap(),
            &[20000.0, 120000.0, 90000.0, 50000.0]
        );
    }

    #[test]
    fn workbook_default_layout_keeps_code_row_and_index() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("credit.xlsx");
        write_credit_workbook(&path);

        let table = DatasetReader::new(&path).read().unwrap();
        // The code row is the header; the real header becomes a text row.
        assert_eq!(table.column_names(), vec!["unnamed_0", "x1", "x2", "y"]);
        assert_eq!(table.n_rows(), 5);
        assert!(!table.column("x1").unwrap().is_numeric());
    }

    #[test]
    fn misnamed_xls_reads_through_xlsx_engine() {
        let dir = tempfile::TempDir::new().unwrap();
        let xlsx = dir.path().join("credit.xlsx");
        write_credit_workbook(&xlsx);
        let xls = dir.path().join("default of credit card clients.xls");
        std::fs::copy(&xlsx, &xls).unwrap();

        let table = DatasetReader::new(&xls).with_layout(credit_layout()).read().unwrap();
        assert_eq!(table.n_rows(), 4);
        assert_eq!(table.n_cols(), 3);
        assert_eq!(
            table.column("default payment next month").unwrap().as_numeric().unwrap(),
            &[1.0, 1.0, 0.0, 0.0]
        );
    }
}
