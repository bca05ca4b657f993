use credit_risk_io::IoError;

/// Errors from data preparation.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when the dataset cannot be read.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Returned when the target column is not in the table.
    #[error("target column \"{column}\" not found; available columns: {}", .available.join(", "))]
    TargetColumnMissing {
        /// Normalized name that was looked up.
        column: String,
        /// Normalized names present in the table.
        available: Vec<String>,
    },

    /// Returned when the target holds fewer than two distinct values.
    #[error("target column \"{column}\" has {n_classes} distinct value(s), need at least 2")]
    TooFewClasses {
        /// Target column name.
        column: String,
        /// Number of distinct values found.
        n_classes: usize,
    },

    /// Returned when a feature column is still text after encoding.
    #[error("column \"{column}\" is not numeric and not listed as categorical")]
    NonNumericFeature {
        /// The offending column.
        column: String,
    },

    /// Returned when the test fraction cannot produce a valid split.
    #[error("invalid test size {test_size}: {reason}")]
    InvalidSplitSize {
        /// Requested test fraction.
        test_size: f64,
        /// Why the split is impossible.
        reason: String,
    },

    /// Returned when a class is too small to synthesize neighbours for.
    #[error("class {class} has {count} samples, SMOTE needs at least {required}")]
    InsufficientMinoritySamples {
        /// Class code.
        class: usize,
        /// Samples of that class in the training partition.
        count: usize,
        /// Minimum required (k + 1).
        required: usize,
    },

    /// Returned when the balancer configuration is out of range.
    #[error("invalid balancer setting: {reason}")]
    InvalidBalancer {
        /// What is wrong.
        reason: String,
    },

    /// Returned when columns differ from those seen at fit time.
    #[error("column mismatch: expected [{}], got [{}]", .expected.join(", "), .got.join(", "))]
    ColumnMismatch {
        /// Names and order seen at fit time.
        expected: Vec<String>,
        /// Names and order supplied now.
        got: Vec<String>,
    },

    /// Returned when features and labels have different lengths.
    #[error("feature matrix has {n_rows} rows but {n_labels} labels were given")]
    LengthMismatch {
        /// Rows in the feature matrix.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when an operation receives zero rows.
    #[error("dataset has zero rows")]
    EmptyDataset,
}
