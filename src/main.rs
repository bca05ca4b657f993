use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use credit_risk_io::{ResultWriter, SvgReportSink};
use credit_risk_prep::{ClassShare, load_and_prepare};
use credit_risk_report::{ChartJob, ChartOutcome, ClassificationReport, Evaluator, Explainer};
use credit_risk_rf::{ForestClassifier, RankedFeature};

mod config;

use config::Settings;

/// Things to check when a run fails before producing artifacts.
const CHECKLIST: [&str; 4] = [
    "the data file path is correct",
    "the file is CSV/TSV or a spreadsheet (.xls, .xlsx, .xlsm, .xlsb, .ods)",
    "the target column exists in the header row",
    "every cell is filled and feature columns are numeric or listed as categorical",
];

#[derive(Parser)]
#[command(name = "credit-risk")]
#[command(about = "Credit-default prediction with a random forest and TreeSHAP explanations")]
#[command(version)]
struct Cli {
    /// Path to the dataset (CSV, TSV or spreadsheet)
    #[arg(long, default_value = "default of credit card clients.xls")]
    data: PathBuf,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// RNG seed for splitting and SMOTE; the forest keeps its configured seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Maximum number of features shown in the SHAP summary and bar charts
    #[arg(long, default_value_t = 15)]
    max_display: usize,

    /// Directory for charts and the JSON report
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

/// Written to `report.json`.
#[derive(Serialize)]
struct RunReport<'a> {
    data: String,
    n_train: usize,
    n_test: usize,
    n_synthetic: usize,
    train_distribution: &'a [ClassShare],
    feature_names: &'a [String],
    encoded_features: &'a [String],
    metrics: &'a ClassificationReport,
    importances: &'a [RankedFeature],
    shap_base_value: f64,
    n_explained: usize,
    charts: &'a [ChartOutcome],
}

/// Printed to stdout.
#[derive(Serialize)]
struct RunSummary {
    accuracy: f64,
    macro_f1: f64,
    weighted_f1: f64,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    report: String,
    charts_written: usize,
    charts_failed: usize,
}

impl Cli {
    /// Defaults with the command-line overrides applied.
    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.data.test_size = self.test_size;
        settings.data.seed = self.seed;
        settings.viz.max_display = self.max_display;
        if let Some(dir) = &self.output_dir {
            settings.paths.output_dir.clone_from(dir);
        }
        settings
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let settings = cli.settings();
    if let Err(e) = run(&cli.data, &settings) {
        error!(error = %format!("{e:#}"), "pipeline failed");
        error!("please check that:");
        for item in CHECKLIST {
            error!("  - {item}");
        }
        return Err(e);
    }
    Ok(())
}

fn run(data: &std::path::Path, settings: &Settings) -> Result<()> {
    let paths = &settings.paths;
    let writer = ResultWriter::new(&paths.output_dir)?;

    // 1. Load and prepare
    let pipeline = settings.pipeline_config()?;
    let prepared = load_and_prepare(data, &pipeline)
        .with_context(|| format!("failed to prepare {}", data.display()))?;
    let encoded = prepared.encoded_names();
    info!(
        n_train = prepared.y_train.len(),
        n_test = prepared.y_test.len(),
        n_features = encoded.len(),
        "data prepared"
    );

    // 2. Train
    let mut model = ForestClassifier::new(settings.forest_config()?);
    model
        .train(prepared.x_train.rows(), &prepared.y_train, encoded)
        .context("model training failed")?;
    let importances = model.importances()?;
    for f in importances.iter().take(10) {
        info!(rank = f.rank, feature = %f.name, importance = f.importance, "feature importance");
    }

    // 3. Evaluate
    let sink = SvgReportSink::new(settings.viz.dpi);
    let report = Evaluator::new(&sink)
        .with_class_labels(prepared.target.labels())
        .evaluate(
            &model,
            prepared.x_test.rows(),
            &prepared.y_test,
            &writer.path(&paths.confusion_matrix),
        )
        .context("evaluation failed")?;
    info!("classification report:\n{report}");

    // 4. Explain
    let explainer = Explainer::new(&model, encoded)?.with_max_rows(settings.viz.max_explain_rows);
    let attributions = explainer
        .explain(prepared.x_test.rows())
        .context("explanation failed")?;
    let jobs = [
        (ChartJob::Summary, writer.path(&paths.shap_summary)),
        (ChartJob::Bar, writer.path(&paths.shap_bar)),
        (ChartJob::FirstPrediction, writer.path(&paths.shap_first_prediction)),
        (ChartJob::Waterfall, writer.path(&paths.shap_waterfall)),
    ];
    let charts = explainer.render(&attributions, &sink, &jobs, settings.viz.max_display);

    // 5. Write report and summary
    writer.write_json(
        &paths.report,
        &RunReport {
            data: data.display().to_string(),
            n_train: prepared.y_train.len(),
            n_test: prepared.y_test.len(),
            n_synthetic: prepared.n_synthetic,
            train_distribution: &prepared.train_distribution,
            feature_names: &prepared.feature_names,
            encoded_features: encoded,
            metrics: &report,
            importances,
            shap_base_value: attributions.base_value,
            n_explained: attributions.n_rows(),
            charts: &charts,
        },
    )?;

    let written = charts.iter().filter(|c| c.is_ok()).count();
    let output = RunSummary {
        accuracy: report.accuracy,
        macro_f1: report.macro_avg.f1,
        weighted_f1: report.weighted_avg.f1,
        n_train: prepared.y_train.len(),
        n_test: prepared.y_test.len(),
        n_features: encoded.len(),
        report: writer.path(&paths.report).display().to_string(),
        charts_written: written,
        charts_failed: charts.len() - written,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_flag_leaves_forest_seed_alone() {
        let cli = Cli::parse_from(["credit-risk", "--seed", "7", "--test-size", "0.3"]);
        let settings = cli.settings();
        assert_eq!(settings.data.seed, 7);
        assert_eq!(settings.model.seed, Settings::default().model.seed);
        assert!((settings.data.test_size - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn output_dir_override() {
        let cli = Cli::parse_from(["credit-risk", "--output-dir", "runs/a", "--max-display", "8"]);
        let settings = cli.settings();
        assert_eq!(settings.paths.output_dir, PathBuf::from("runs/a"));
        assert_eq!(settings.viz.max_display, 8);
    }
}
