use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fraud_recon::{
    load_data_dir, load_fraud, load_transactions, AggregationResult, Column, FraudPipeline,
    PipelineConfig, PipelineError,
};

/// Classify card transactions by vendor and reconcile them against a fraud list
#[derive(Debug, Parser)]
#[command(name = "fraud-recon", version)]
struct Cli {
    /// Fraud list (credit_card_number,ipv4[,state]), CSV or .zip
    #[arg(long, required_unless_present = "data_dir")]
    fraud: Option<PathBuf>,

    /// Transactions (credit_card_number,ipv4,state), CSV or .zip; repeat for several files
    #[arg(long = "transactions", required_unless_present = "data_dir")]
    transactions: Vec<PathBuf>,

    /// Directory holding fraud.zip and transaction-*.zip
    #[arg(long, conflicts_with_all = ["fraud", "transactions"])]
    data_dir: Option<PathBuf>,

    /// Pipeline configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column to count fraudulent transactions by; repeatable
    #[arg(long = "group-by", default_value = "vendor")]
    group_by: Vec<Column>,

    /// Print the run report and aggregations as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "fraud_recon=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = FraudPipeline::new(config)?;

    let (fraud, batches) = match (&cli.data_dir, &cli.fraud) {
        (Some(dir), _) => load_data_dir(dir)?,
        (None, Some(fraud)) => {
            let batches = cli
                .transactions
                .iter()
                .map(|path| load_transactions(path))
                .collect::<Result<Vec<_>>>()?;
            (load_fraud(fraud)?, batches)
        }
        (None, None) => bail!("either --data-dir or --fraud is required"),
    };

    let output = match pipeline.run(&fraud, &batches) {
        Ok(output) => output,
        Err(PipelineError::Validation(failure)) => {
            for error in &failure.errors {
                eprintln!("{error}");
            }
            return Err(failure).context("input data failed validation");
        }
        Err(err) => return Err(err.into()),
    };

    let aggregations: Vec<AggregationResult> = cli
        .group_by
        .iter()
        .map(|column| output.fraud_counts(*column))
        .collect();

    if cli.json {
        let body = serde_json::json!({
            "report": output.report,
            "fraud_counts": aggregations,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", output.report.summary());
    for warning in &output.report.warnings {
        println!("  warning: {warning}");
    }
    for aggregation in &aggregations {
        print_table(aggregation);
    }

    Ok(())
}

fn print_table(aggregation: &AggregationResult) {
    println!("\nFraudulent transactions by {}", aggregation.column);
    println!("{:<24} {:>8}", aggregation.column.name(), "count");
    for row in &aggregation.rows {
        println!("{:<24} {:>8}", row.key.as_deref().unwrap_or("null"), row.count);
    }
}
