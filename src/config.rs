//! Static run settings and their conversion into stage configs.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use credit_risk_io::SpreadsheetLayout;
use credit_risk_prep::{ClassBalancer, PipelineConfig};
use credit_risk_rf::{ClassWeight, MaxFeatures, RandomForestConfig, SplitCriterion};

/// Random forest hyperparameters.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSettings {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    pub balanced_class_weight: bool,
}

/// Dataset and preparation parameters.
#[derive(Debug, Clone, Serialize)]
pub struct DataSettings {
    pub test_size: f64,
    pub seed: u64,
    pub target_column: String,
    pub categorical_columns: Vec<String>,
    /// Smallest class share that counts as balanced.
    pub imbalance_threshold: f64,
    pub smote_k_neighbors: usize,
    #[serde(skip)]
    pub layout: SpreadsheetLayout,
}

/// Chart parameters.
#[derive(Debug, Clone, Serialize)]
pub struct VizSettings {
    /// Features shown in the summary and bar charts.
    pub max_display: usize,
    pub dpi: u32,
    /// Test rows explained; `None` explains all of them.
    pub max_explain_rows: Option<usize>,
}

/// Artifact locations.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub output_dir: PathBuf,
    pub confusion_matrix: String,
    pub shap_summary: String,
    pub shap_bar: String,
    pub shap_first_prediction: String,
    pub shap_waterfall: String,
    pub report: String,
}

/// Everything a run needs besides the input path.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub model: ModelSettings,
    pub data: DataSettings,
    pub viz: VizSettings,
    pub paths: OutputPaths,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelSettings {
                n_trees: 100,
                max_depth: Some(10),
                seed: 42,
                balanced_class_weight: true,
            },
            data: DataSettings {
                test_size: 0.2,
                seed: 42,
                target_column: "default payment next month".into(),
                categorical_columns: vec!["sex".into(), "education".into(), "marriage".into()],
                imbalance_threshold: 0.30,
                smote_k_neighbors: 5,
                // The public workbook has a title row above the header and an ID column.
                layout: SpreadsheetLayout {
                    header_row: 1,
                    drop_index_column: true,
                },
            },
            viz: VizSettings {
                max_display: 15,
                dpi: 300,
                max_explain_rows: Some(1000),
            },
            paths: OutputPaths {
                output_dir: PathBuf::from("output"),
                confusion_matrix: "confusion_matrix.svg".into(),
                shap_summary: "shap_summary.svg".into(),
                shap_bar: "shap_bar.svg".into(),
                shap_first_prediction: "shap_first_prediction.svg".into(),
                shap_waterfall: "shap_waterfall_plot.svg".into(),
                report: "report.json".into(),
            },
        }
    }
}

impl Settings {
    /// Build the preparation config.
    ///
    /// # Errors
    ///
    /// Fails if the imbalance threshold is outside (0, 1].
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let d = &self.data;
        let balancer =
            ClassBalancer::new(d.imbalance_threshold)?.with_k_neighbors(d.smote_k_neighbors);
        Ok(PipelineConfig::new(&d.target_column)
            .with_categorical_columns(d.categorical_columns.as_slice())
            .with_test_size(d.test_size)
            .with_seed(d.seed)
            .with_balancer(balancer)
            .with_layout(d.layout))
    }

    /// Build the forest config.
    ///
    /// # Errors
    ///
    /// Fails if `n_trees` is zero.
    pub fn forest_config(&self) -> Result<RandomForestConfig> {
        let m = &self.model;
        let class_weight = if m.balanced_class_weight {
            ClassWeight::Balanced
        } else {
            ClassWeight::Uniform
        };
        Ok(RandomForestConfig::new(m.n_trees)?
            .with_max_depth(m.max_depth)
            .with_max_features(MaxFeatures::Sqrt)
            .with_criterion(SplitCriterion::Gini)
            .with_class_weight(class_weight)
            .with_seed(m.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_credit_workbook() {
        let s = Settings::default();
        assert_eq!(s.data.target_column, "default payment next month");
        assert_eq!(s.data.categorical_columns, ["sex", "education", "marriage"]);
        assert_eq!(s.data.layout.header_row, 1);
        assert!(s.data.layout.drop_index_column);
        assert_eq!(s.viz.max_display, 15);
        assert_eq!(s.paths.shap_waterfall, "shap_waterfall_plot.svg");
    }

    #[test]
    fn stage_configs_follow_settings() {
        let mut s = Settings::default();
        s.data.seed = 7;
        s.data.test_size = 0.25;
        let pipeline = s.pipeline_config().unwrap();
        assert_eq!(pipeline.seed(), 7);
        assert!((pipeline.test_size() - 0.25).abs() < f64::EPSILON);
        assert_eq!(pipeline.balancer().k_neighbors(), 5);

        let forest = s.forest_config().unwrap();
        assert_eq!(forest.n_trees(), 100);
        assert_eq!(forest.max_depth(), Some(10));
        assert_eq!(forest.class_weight(), ClassWeight::Balanced);
        assert_eq!(forest.max_features(), MaxFeatures::Sqrt);
    }

    #[test]
    fn bad_threshold_is_rejected() {
        let mut s = Settings::default();
        s.data.imbalance_threshold = 1.5;
        assert!(s.pipeline_config().is_err());
    }
}
