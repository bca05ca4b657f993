//! Profile a dataset: shape, column summaries and likely target columns.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use credit_risk_io::{DatasetProfile, DatasetReader, SpreadsheetLayout, profile};

#[derive(Parser)]
#[command(name = "explore")]
#[command(about = "Summarize the columns of a dataset and suggest target columns")]
#[command(version)]
struct Cli {
    /// Path to the dataset (CSV, TSV or spreadsheet)
    #[arg(long, default_value = "default of credit card clients.xls")]
    data: PathBuf,

    /// Zero-based worksheet row holding the column names
    #[arg(long, default_value_t = 1)]
    header_row: usize,

    /// Keep the first worksheet column instead of dropping it as a row index
    #[arg(long)]
    keep_index: bool,

    /// Print the profile as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose { "debug" } else { "warn" })
        .with_writer(std::io::stderr)
        .init();

    let layout = SpreadsheetLayout {
        header_row: cli.header_row,
        drop_index_column: !cli.keep_index,
    };
    let table = DatasetReader::new(&cli.data)
        .with_layout(layout)
        .read()
        .with_context(|| format!("failed to read {}", cli.data.display()))?;
    info!(n_rows = table.n_rows(), n_cols = table.n_cols(), "dataset loaded");

    let summary = profile(&table);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_profile(&cli.data, &summary);
    }
    Ok(())
}

fn print_profile(path: &std::path::Path, p: &DatasetProfile) {
    let rule = "=".repeat(50);
    println!("{rule}\nExploring dataset: {}\n{rule}", path.display());
    println!("Dataset shape: ({}, {})", p.n_rows, p.n_cols);

    println!("\n{rule}\nCOLUMN INFORMATION\n{rule}");
    let width = p.columns.iter().map(|c| c.name.len()).max().unwrap_or(0).max(6);
    println!("{:<width$}  {:<7}  {:>6}  sample", "column", "type", "unique");
    for c in &p.columns {
        println!("{:<width$}  {:<7}  {:>6}  {}", c.name, c.kind, c.n_unique, c.sample);
    }

    println!("\n{rule}\nPOTENTIAL TARGET COLUMNS\n{rule}");
    if p.candidate_targets.is_empty() {
        println!("No column has between 2 and 5 distinct values.");
        return;
    }
    for (i, t) in p.candidate_targets.iter().enumerate() {
        println!("\n{}. Column: {}", i + 1, t.name);
        println!("   Unique values: {}", t.counts.len());
        for (value, count) in &t.counts {
            let pct = 100.0 * *count as f64 / p.n_rows.max(1) as f64;
            println!("     - {value}: {count} ({pct:.1}%)");
        }
    }
}
