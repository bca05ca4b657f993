//! `load_and_prepare`: read, encode, split, balance, scale.

use std::path::Path;

use credit_risk_io::{DatasetReader, SpreadsheetLayout, Table};
use tracing::{info, instrument};

use crate::PrepError;
use crate::balance::{ClassBalancer, ClassShare};
use crate::encode::{CategoricalEncoder, Encoding};
use crate::matrix::FeatureMatrix;
use crate::scale::StandardScaler;
use crate::split::stratified_split;
use crate::target::{TargetEncoding, split_target};

/// Settings for [`load_and_prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    target_column: String,
    categorical_columns: Vec<String>,
    test_size: f64,
    seed: u64,
    balancer: ClassBalancer,
    layout: SpreadsheetLayout,
}

impl PipelineConfig {
    /// Create a config for the given target column.
    ///
    /// Defaults: no categorical columns, test size 0.2, seed 42, the default
    /// [`ClassBalancer`], header on the first row.
    #[must_use]
    pub fn new(target_column: &str) -> Self {
        Self {
            target_column: target_column.to_string(),
            categorical_columns: Vec::new(),
            test_size: 0.2,
            seed: 42,
            balancer: ClassBalancer::default(),
            layout: SpreadsheetLayout::default(),
        }
    }

    /// Set the columns to one-hot encode, in encoded order.
    #[must_use]
    pub fn with_categorical_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.categorical_columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Set the test fraction.
    #[must_use]
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Set the seed shared by the split and SMOTE.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the class balancer.
    #[must_use]
    pub fn with_balancer(mut self, balancer: ClassBalancer) -> Self {
        self.balancer = balancer;
        self
    }

    /// Set the spreadsheet layout.
    #[must_use]
    pub fn with_layout(mut self, layout: SpreadsheetLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Return the target column name.
    #[must_use]
    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Return the categorical column names.
    #[must_use]
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    /// Return the test fraction.
    #[must_use]
    pub fn test_size(&self) -> f64 {
        self.test_size
    }

    /// Return the seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the class balancer.
    #[must_use]
    pub fn balancer(&self) -> &ClassBalancer {
        &self.balancer
    }

    /// Return the spreadsheet layout.
    #[must_use]
    pub fn layout(&self) -> SpreadsheetLayout {
        self.layout
    }
}

/// Model-ready partitions and the fitted preprocessing state.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Scaled, balanced training features.
    pub x_train: FeatureMatrix,
    /// Scaled test features.
    pub x_test: FeatureMatrix,
    /// Balanced training labels.
    pub y_train: Vec<usize>,
    /// Test labels.
    pub y_test: Vec<usize>,
    /// Feature names before one-hot expansion.
    pub feature_names: Vec<String>,
    /// Fitted column layout; its feature names label `x_train` and `x_test`.
    pub encoding: Encoding,
    /// Scaler fitted on the balanced training partition.
    pub scaler: StandardScaler,
    /// Class-code mapping of the target.
    pub target: TargetEncoding,
    /// Training class distribution before balancing.
    pub train_distribution: Vec<ClassShare>,
    /// Number of synthetic training rows.
    pub n_synthetic: usize,
}

impl PreparedData {
    /// Encoded feature names, in column order.
    #[must_use]
    pub fn encoded_names(&self) -> &[String] {
        self.encoding.feature_names()
    }
}

/// Read the dataset at `path` and prepare it for modelling.
///
/// # Errors
///
/// [`PrepError::Io`] from reading, or any error of [`prepare_table`].
#[instrument(skip(config), fields(path = %path.display()))]
pub fn load_and_prepare(path: &Path, config: &PipelineConfig) -> Result<PreparedData, PrepError> {
    let table = DatasetReader::new(path).with_layout(config.layout).read()?;
    prepare_table(table, config)
}

/// Prepare an already loaded table.
///
/// Stages run in order: target split, one-hot encoding, stratified split,
/// SMOTE on the training partition, then scaling fit on the balanced
/// training partition. The first failing stage aborts the run.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PrepError::TargetColumnMissing`] | Target column not found |
/// | [`PrepError::TooFewClasses`] | Target has one distinct value |
/// | [`PrepError::NonNumericFeature`] | Text column not listed as categorical |
/// | [`PrepError::InvalidSplitSize`] | Bad test fraction |
/// | [`PrepError::InsufficientMinoritySamples`] | Minority too small for SMOTE |
pub fn prepare_table(table: Table, config: &PipelineConfig) -> Result<PreparedData, PrepError> {
    let (features, y, target) = split_target(table, &config.target_column)?;
    let feature_names = features.column_names();

    let encoder = CategoricalEncoder::new(&config.categorical_columns);
    let (x, encoding) = encoder.fit_transform(&features)?;

    let split = stratified_split(&x, &y, config.test_size, config.seed)?;
    let balanced = config.balancer.balance(&split.x_train, &split.y_train, config.seed)?;

    let (x_train, scaler) = StandardScaler::fit_transform(&balanced.x)?;
    let x_test = scaler.transform(&split.x_test)?;

    info!(
        n_train = x_train.n_rows(),
        n_test = x_test.n_rows(),
        n_features = x_train.n_cols(),
        n_synthetic = balanced.n_synthetic,
        "data prepared"
    );

    Ok(PreparedData {
        x_train,
        x_test,
        y_train: balanced.y,
        y_test: split.y_test,
        feature_names,
        encoding,
        scaler,
        target,
        train_distribution: balanced.before,
        n_synthetic: balanced.n_synthetic,
    })
}
