/// Errors raised while configuring, training or querying a forest.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// The forest was configured with no trees.
    #[error("a forest needs at least one tree, got {n_trees}")]
    InvalidTreeCount {
        /// Requested tree count.
        n_trees: usize,
    },

    /// `max_depth` was `Some(0)`.
    #[error("max_depth must be positive, got {max_depth}")]
    InvalidMaxDepth {
        /// Requested depth.
        max_depth: usize,
    },

    /// `min_samples_split` was below 2.
    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// Requested minimum.
        min_samples_split: usize,
    },

    /// `min_samples_leaf` was 0.
    #[error("min_samples_leaf must be positive, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// Requested minimum.
        min_samples_leaf: usize,
    },

    /// The feature subsample size fell outside `1..=n_features`.
    #[error("{max_features} features per split is outside 1..={n_features}")]
    InvalidMaxFeatures {
        /// Resolved subsample size.
        max_features: usize,
        /// Columns available.
        n_features: usize,
    },

    /// No rows were supplied.
    #[error("no samples to learn from")]
    EmptyDataset,

    /// Rows have no columns.
    #[error("samples have no feature columns")]
    ZeroFeatures,

    /// Row and label counts differ.
    #[error("{n_features_rows} feature rows but {n_labels} labels")]
    LabelCountMismatch {
        /// Rows supplied.
        n_features_rows: usize,
        /// Labels supplied.
        n_labels: usize,
    },

    /// A label is not below the class count.
    #[error("label {label} of sample {sample_index} is not below {n_classes}")]
    LabelOutOfRange {
        /// Offending label.
        label: usize,
        /// Class count.
        n_classes: usize,
        /// Row of the label.
        sample_index: usize,
    },

    /// The name list does not match the column count.
    #[error("{got} feature names for {expected} columns")]
    FeatureNameMismatch {
        /// Column count.
        expected: usize,
        /// Names supplied.
        got: usize,
    },

    /// A training row is wider or narrower than the first one.
    #[error("training row {sample_index} has {got} values, expected {expected}")]
    FeatureCountMismatch {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Offending row.
        sample_index: usize,
    },

    /// A row to predict has the wrong width.
    #[error("cannot predict a row of {got} values with a model of {expected} features")]
    PredictionFeatureMismatch {
        /// Model width.
        expected: usize,
        /// Row width.
        got: usize,
    },

    /// A training value is NaN or infinite.
    #[error("sample {sample_index} has a non-finite value in column {feature_index}")]
    NonFiniteValue {
        /// Offending row.
        sample_index: usize,
        /// Offending column.
        feature_index: usize,
    },

    /// The classifier was queried before training.
    #[error("the classifier must be trained before it can predict")]
    NotFitted,
}
