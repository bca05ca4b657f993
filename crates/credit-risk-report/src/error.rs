use credit_risk_io::IoError;
use credit_risk_rf::RfError;

/// Errors from evaluation and explanation.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Returned when the model is unfitted or rejects the input.
    #[error(transparent)]
    Rf(#[from] RfError),

    /// Returned when an artifact cannot be rendered or written.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Returned when a width disagrees with the model's feature count.
    #[error("{what} has {got} columns, model expects {expected}")]
    ColumnMismatch {
        /// What was checked (feature names, a data row).
        what: String,
        /// Model feature count.
        expected: usize,
        /// Width supplied.
        got: usize,
    },

    /// Returned when there are no rows to evaluate or explain.
    #[error("no rows to process")]
    EmptyInput,
}
