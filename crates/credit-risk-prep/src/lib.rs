//! Data preparation for the credit-risk pipeline.
//!
//! Turns a loaded [`credit_risk_io::Table`] into model-ready partitions:
//! target coding, drop-first one-hot encoding, stratified train/test split,
//! SMOTE oversampling of the training partition, and standardization.

mod balance;
mod encode;
mod error;
mod matrix;
mod pipeline;
mod scale;
mod split;
mod target;

pub use balance::{Balanced, ClassBalancer, ClassShare};
pub use encode::{CategoricalEncoder, DummyBlock, Encoding};
pub use error::PrepError;
pub use matrix::FeatureMatrix;
pub use pipeline::{PipelineConfig, PreparedData, load_and_prepare, prepare_table};
pub use scale::StandardScaler;
pub use split::{TrainTestSplit, stratified_split};
pub use target::{TargetEncoding, split_target};
