//! Random forest classifier for the credit-risk pipeline.
//!
//! CART trees are grown in parallel on bootstrap draws with optional
//! balanced class weights; predictions average the trees' leaf
//! distributions. Fitted trees expose their node arena (split thresholds,
//! leaf distributions, class-weighted cover) so attribution code can walk
//! them.

mod classifier;
mod config;
mod confusion;
mod error;
mod fitted;
mod forest;
mod node;
mod split;
mod tree;

pub use classifier::ForestClassifier;
pub use config::{ClassWeight, MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use fitted::{RandomForestResult, RankedFeature, TrainingMetadata};
pub use forest::{ClassDistribution, RandomForest};
pub use node::{FeatureIndex, Node, NodeIndex};
pub use split::SplitCriterion;
pub use tree::DecisionTree;
