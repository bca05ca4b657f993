//! I/O error types for credit-risk-io.

use std::path::PathBuf;

/// Errors from dataset reading, chart rendering, and result writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file extension is not a known tabular format.
    #[error("unsupported file format \"{extension}\" for {path}")]
    UnsupportedFormat {
        /// Path that was attempted.
        path: PathBuf,
        /// The lower-cased extension, empty when the file has none.
        extension: String,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when every spreadsheet engine failed to parse the workbook.
    #[error("cannot parse spreadsheet {path}: {}", .attempts.join("; "))]
    SpreadsheetParse {
        /// Path to the workbook.
        path: PathBuf,
        /// One `engine: reason` entry per attempted engine, in order.
        attempts: Vec<String>,
    },

    /// Returned when the file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of cells than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} cells, expected {expected}")]
    InconsistentRowLength {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of cells (from header).
        expected: usize,
        /// Actual number of cells in this row.
        got: usize,
    },

    /// Returned when a cell is empty.
    #[error("missing value in {path}: row {row_index}, column \"{column}\"")]
    MissingValue {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Normalized column name.
        column: String,
    },

    /// Returned when two columns share a name after normalization.
    #[error("duplicate column \"{column}\"")]
    DuplicateColumn {
        /// The duplicated, normalized name.
        column: String,
    },

    /// Returned when columns of one table have different lengths.
    #[error("column \"{column}\" has {got} rows, expected {expected}")]
    ColumnLength {
        /// The offending column.
        column: String,
        /// Row count of the first column.
        expected: usize,
        /// Row count of the offending column.
        got: usize,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a value cannot be serialized to JSON.
    #[error("cannot serialize {path} as JSON")]
    SerializeJson {
        /// Destination path.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },

    /// Returned when a chart cannot be drawn or saved.
    #[error("cannot render chart {path}: {reason}")]
    RenderChart {
        /// Destination path.
        path: PathBuf,
        /// Backend failure message.
        reason: String,
    },
}
