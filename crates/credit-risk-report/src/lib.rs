//! Evaluation and explanation of a fitted credit-risk classifier.
//!
//! [`Evaluator`] scores held-out predictions and draws the confusion matrix;
//! [`Explainer`] computes exact TreeSHAP attributions of the positive-class
//! probability and draws the summary, bar, first-prediction and waterfall
//! charts, carrying on past any chart that fails.

mod error;
mod evaluate;
mod explainer;
mod shap;

pub use error::ReportError;
pub use evaluate::{AverageMetrics, ClassReport, ClassificationReport, Evaluator};
pub use explainer::{Attributions, ChartJob, ChartOutcome, Explainer};
pub use shap::TreeShap;
