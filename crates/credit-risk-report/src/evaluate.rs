//! Held-out evaluation: classification report and confusion-matrix chart.

use std::fmt;
use std::path::Path;

use credit_risk_io::{Chart, ReportSink};
use credit_risk_rf::{ConfusionMatrix, ForestClassifier};
use serde::Serialize;
use tracing::{info, instrument};

use crate::ReportError;

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    /// Class label as shown in the report.
    pub label: String,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

/// An averaged row of the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AverageMetrics {
    /// Averaged precision.
    pub precision: f64,
    /// Averaged recall.
    pub recall: f64,
    /// Averaged F1.
    pub f1: f64,
    /// Total samples.
    pub support: usize,
}

/// Metrics of a classifier on labelled data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// One entry per class, by class code.
    pub classes: Vec<ClassReport>,
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// Unweighted mean over classes.
    pub macro_avg: AverageMetrics,
    /// Support-weighted mean over classes.
    pub weighted_avg: AverageMetrics,
    /// `confusion[actual][predicted]`.
    pub confusion: Vec<Vec<usize>>,
}

impl ClassificationReport {
    fn from_confusion(cm: &ConfusionMatrix, labels: &[String]) -> Self {
        let metrics = cm.class_metrics();
        let total = cm.total();
        let k = metrics.len().max(1) as f64;

        let classes: Vec<ClassReport> = metrics
            .iter()
            .map(|m| ClassReport {
                label: labels
                    .get(m.class)
                    .cloned()
                    .unwrap_or_else(|| m.class.to_string()),
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect();

        let macro_avg = AverageMetrics {
            precision: metrics.iter().map(|m| m.precision).sum::<f64>() / k,
            recall: metrics.iter().map(|m| m.recall).sum::<f64>() / k,
            f1: metrics.iter().map(|m| m.f1).sum::<f64>() / k,
            support: total,
        };
        let weighted = |f: fn(&credit_risk_rf::ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                metrics.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
            confusion: cm.as_rows().to_vec(),
        }
    }

    /// Total number of evaluated samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.macro_avg.support
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.n_samples()
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

/// Scores a fitted classifier and renders its confusion matrix.
pub struct Evaluator<'a> {
    sink: &'a dyn ReportSink,
    class_labels: Vec<String>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator that renders through `sink`.
    #[must_use]
    pub fn new(sink: &'a dyn ReportSink) -> Self {
        Self {
            sink,
            class_labels: Vec::new(),
        }
    }

    /// Set display labels by class code; codes print as numbers otherwise.
    #[must_use]
    pub fn with_class_labels(mut self, labels: &[String]) -> Self {
        self.class_labels = labels.to_vec();
        self
    }

    /// Predict `x`, compare with `y`, and render the confusion matrix to
    /// `chart_path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ReportError::EmptyInput`] | `x` has no rows |
    /// | [`ReportError::Rf`] | Model unfitted, wrong row width, or label mismatch |
    /// | [`ReportError::Io`] | The chart cannot be rendered |
    #[instrument(skip_all, fields(n_rows = x.len(), path = %chart_path.display()))]
    pub fn evaluate(
        &self,
        model: &ForestClassifier,
        x: &[Vec<f64>],
        y: &[usize],
        chart_path: &Path,
    ) -> Result<ClassificationReport, ReportError> {
        if x.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        let predicted = model.predict(x)?;
        let n_classes = model
            .forest()?
            .n_classes()
            .max(y.iter().max().map_or(0, |&m| m + 1));
        let cm = ConfusionMatrix::from_labels(y, &predicted, n_classes)?;
        let report = ClassificationReport::from_confusion(&cm, &self.class_labels);

        info!(
            accuracy = report.accuracy,
            macro_f1 = report.macro_avg.f1,
            weighted_f1 = report.weighted_avg.f1,
            "model evaluated"
        );

        let labels: Vec<String> = report.classes.iter().map(|c| c.label.clone()).collect();
        let chart = Chart::Heatmap {
            title: "Confusion Matrix".into(),
            x_label: "Predicted".into(),
            y_label: "Actual".into(),
            row_labels: labels.clone(),
            col_labels: labels,
            values: report
                .confusion
                .iter()
                .map(|row| row.iter().map(|&v| v as f64).collect())
                .collect(),
        };
        self.sink.render(&chart, chart_path)?;

        Ok(report)
    }
}
