//! Per-prediction feature attributions and their charts.

use std::fmt;
use std::path::{Path, PathBuf};

use credit_risk_io::{Bar, Chart, ReportSink, SwarmRow};
use credit_risk_rf::{ForestClassifier, RandomForest};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::ReportError;
use crate::shap::TreeShap;

/// Rows shown in the single-prediction charts.
const TOP_SINGLE: usize = 10;

/// SHAP values for a batch of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attributions {
    /// Expected model output.
    pub base_value: f64,
    /// `values[row][feature]`.
    pub values: Vec<Vec<f64>>,
    /// One name per feature column.
    pub feature_names: Vec<String>,
    /// The explained rows, as given.
    pub data: Vec<Vec<f64>>,
}

impl Attributions {
    /// Number of explained rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    /// Mean absolute attribution per feature.
    #[must_use]
    pub fn mean_abs(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.feature_names.len()];
        for row in &self.values {
            for (t, v) in totals.iter_mut().zip(row) {
                *t += v.abs();
            }
        }
        let n = self.values.len().max(1) as f64;
        totals.iter_mut().for_each(|t| *t /= n);
        totals
    }

    /// Feature indices by decreasing mean absolute attribution, at most `limit`.
    #[must_use]
    pub fn ranking(&self, limit: usize) -> Vec<usize> {
        let mean_abs = self.mean_abs();
        let mut order: Vec<usize> = (0..mean_abs.len()).collect();
        order.sort_by(|&a, &b| mean_abs[b].total_cmp(&mean_abs[a]));
        order.truncate(limit);
        order
    }

    /// Model output reconstructed for one row: base plus its attributions.
    #[must_use]
    pub fn output(&self, row: usize) -> f64 {
        self.base_value + self.values[row].iter().sum::<f64>()
    }
}

/// A chart the explainer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartJob {
    /// Beeswarm of attributions per feature.
    Summary,
    /// Mean absolute attribution per feature.
    Bar,
    /// Largest attributions of the first row, with feature values.
    FirstPrediction,
    /// Running total from the base value for the first row.
    Waterfall,
}

impl ChartJob {
    /// Every job, in rendering order.
    pub const ALL: [ChartJob; 4] = [
        ChartJob::Summary,
        ChartJob::Bar,
        ChartJob::FirstPrediction,
        ChartJob::Waterfall,
    ];
}

impl fmt::Display for ChartJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartJob::Summary => "summary",
            ChartJob::Bar => "bar",
            ChartJob::FirstPrediction => "first_prediction",
            ChartJob::Waterfall => "waterfall",
        };
        f.write_str(name)
    }
}

/// Result of one chart job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOutcome {
    /// Which chart.
    pub job: ChartJob,
    /// Destination path.
    pub path: PathBuf,
    /// Failure message, `None` on success.
    pub error: Option<String>,
}

impl ChartOutcome {
    /// Return `true` when the chart was written.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Explains a fitted forest's positive-class probability with TreeSHAP.
#[derive(Debug)]
pub struct Explainer<'a> {
    forest: &'a RandomForest,
    feature_names: Vec<String>,
    class: usize,
    max_rows: Option<usize>,
}

impl<'a> Explainer<'a> {
    /// Create an explainer for `model`, labelling columns with `feature_names`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ReportError::Rf`] | Model is not fitted |
    /// | [`ReportError::ColumnMismatch`] | Name count differs from the model's feature count |
    pub fn new(model: &'a ForestClassifier, feature_names: &[String]) -> Result<Self, ReportError> {
        let forest = model.forest()?;
        if feature_names.len() != forest.n_features() {
            return Err(ReportError::ColumnMismatch {
                what: "feature name list".into(),
                expected: forest.n_features(),
                got: feature_names.len(),
            });
        }
        Ok(Self {
            forest,
            feature_names: feature_names.to_vec(),
            class: forest.n_classes().saturating_sub(1).min(1),
            max_rows: None,
        })
    }

    /// Explain `class` instead of the positive class (1).
    #[must_use]
    pub fn with_class(mut self, class: usize) -> Self {
        self.class = class;
        self
    }

    /// Explain at most `max_rows` rows; later rows are skipped.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Compute attributions for the leading rows of `x`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ReportError::EmptyInput`] | `x` has no rows |
    /// | [`ReportError::ColumnMismatch`] | A row's width differs from the feature count |
    #[instrument(skip_all, fields(n_rows = x.len(), class = self.class))]
    pub fn explain(&self, x: &[Vec<f64>]) -> Result<Attributions, ReportError> {
        let n = self.max_rows.map_or(x.len(), |m| m.min(x.len()));
        let rows = &x[..n];
        if rows.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        let expected = self.feature_names.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(ReportError::ColumnMismatch {
                what: format!("row {i}"),
                expected,
                got: row.len(),
            });
        }

        let shap = TreeShap::new(self.forest, self.class);
        let values: Vec<Vec<f64>> = rows.par_iter().map(|row| shap.shap_values(row)).collect();
        let base_value = shap.base_value();

        info!(n_explained = n, base_value, "attributions computed");
        Ok(Attributions {
            base_value,
            values,
            feature_names: self.feature_names.clone(),
            data: rows.to_vec(),
        })
    }

    /// Render each `(job, path)` pair, continuing past failures.
    ///
    /// `max_display` caps the features shown in the summary and bar charts.
    /// A failed chart is logged and recorded in its outcome.
    #[instrument(skip_all, fields(n_jobs = jobs.len()))]
    pub fn render(
        &self,
        attributions: &Attributions,
        sink: &dyn ReportSink,
        jobs: &[(ChartJob, PathBuf)],
        max_display: usize,
    ) -> Vec<ChartOutcome> {
        jobs.iter()
            .map(|(job, path)| {
                let result = self.render_one(*job, attributions, sink, path, max_display);
                match &result {
                    Ok(()) => debug!(%job, path = %path.display(), "chart rendered"),
                    Err(e) => warn!(%job, error = %e, "could not create chart"),
                }
                ChartOutcome {
                    job: *job,
                    path: path.clone(),
                    error: result.err().map(|e| e.to_string()),
                }
            })
            .collect()
    }

    fn render_one(
        &self,
        job: ChartJob,
        attributions: &Attributions,
        sink: &dyn ReportSink,
        path: &Path,
        max_display: usize,
    ) -> Result<(), ReportError> {
        if attributions.n_rows() == 0 {
            return Err(ReportError::EmptyInput);
        }
        let chart = match job {
            ChartJob::Summary => summary_chart(attributions, max_display),
            ChartJob::Bar => bar_chart(attributions, max_display),
            ChartJob::FirstPrediction => first_prediction_chart(attributions),
            ChartJob::Waterfall => waterfall_chart(attributions),
        };
        sink.render(&chart, path)?;
        Ok(())
    }
}

fn display_limit(attributions: &Attributions, max_display: usize) -> usize {
    max_display.min(attributions.feature_names.len()).max(1)
}

fn summary_chart(a: &Attributions, max_display: usize) -> Chart {
    let rows = a
        .ranking(display_limit(a, max_display))
        .into_iter()
        .map(|f| {
            let column: Vec<f64> = a.data.iter().map(|r| r[f]).collect();
            let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let points = a
                .values
                .iter()
                .zip(&column)
                .map(|(phi, &v)| {
                    let colour = if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
                    (phi[f], colour)
                })
                .collect();
            SwarmRow {
                label: a.feature_names[f].clone(),
                points,
            }
        })
        .collect();
    Chart::Beeswarm {
        title: "SHAP summary".into(),
        x_label: "SHAP value (impact on model output)".into(),
        rows,
    }
}

fn bar_chart(a: &Attributions, max_display: usize) -> Chart {
    let mean_abs = a.mean_abs();
    let bars = a
        .ranking(display_limit(a, max_display))
        .into_iter()
        .map(|f| Bar {
            label: a.feature_names[f].clone(),
            value: mean_abs[f],
        })
        .collect();
    Chart::Bars {
        title: "Mean absolute SHAP value".into(),
        x_label: "mean(|SHAP value|)".into(),
        bars,
    }
}

/// Features of row 0 by decreasing absolute attribution.
fn top_of_first(a: &Attributions) -> Vec<usize> {
    let phi = &a.values[0];
    let mut order: Vec<usize> = (0..phi.len()).collect();
    order.sort_by(|&x, &y| phi[y].abs().total_cmp(&phi[x].abs()));
    order.truncate(TOP_SINGLE.min(phi.len()));
    order
}

fn first_prediction_chart(a: &Attributions) -> Chart {
    let bars = top_of_first(a)
        .into_iter()
        .map(|f| Bar {
            label: format!("{} = {:.2}", a.feature_names[f], a.data[0][f]),
            value: a.values[0][f],
        })
        .collect();
    Chart::Bars {
        title: format!(
            "Top features affecting the first prediction (f(x) = {:.3})",
            a.output(0)
        ),
        x_label: "SHAP value (impact on model output)".into(),
        bars,
    }
}

fn waterfall_chart(a: &Attributions) -> Chart {
    let steps = top_of_first(a)
        .into_iter()
        .map(|f| Bar {
            label: a.feature_names[f].clone(),
            value: a.values[0][f],
        })
        .collect();
    Chart::Waterfall {
        title: "Top SHAP values for the first prediction".into(),
        x_label: "model output".into(),
        base: a.base_value,
        steps,
    }
}
