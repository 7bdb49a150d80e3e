use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pue_oracle::attestation::{DigestProofGenerator, ProofGenerator, RandomProofGenerator};
use pue_oracle::cli::{Cli, OutputFormat};
use pue_oracle::config::{PipelineConfig, ProofKind};
use pue_oracle::observation::Observation;
use pue_oracle::pipeline::{BatchReport, ForecastPipeline};
use pue_oracle::store::TimeSeriesStore;
use pue_oracle::{csv_io, json_output, noise, synthetic};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Cli) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Read the observation table, or generate synthetic telemetry and save it
fn load_observations(args: &Cli, config: &PipelineConfig) -> Result<Vec<Observation>> {
    if let Some(input) = &args.input {
        let rows = csv_io::read_observations_file(input)
            .with_context(|| format!("Failed to read observations from {}", input.display()))?;
        if args.format == OutputFormat::Text {
            println!("Loaded {} observations from {}", rows.len(), input.display());
        }
        return Ok(rows);
    }

    if args.format == OutputFormat::Text {
        println!("Generating sample data...");
    }
    let mut source = noise::source_for_node(config.seed, "synthetic");
    let rows = synthetic::generate(&config.synthetic, &mut source)?;

    let path = config.output.observations_path();
    csv_io::write_observations_file(&path, &rows)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if args.format == OutputFormat::Text {
        println!(
            "Sample data saved to {} ({} records)",
            path.display(),
            rows.len()
        );
    }
    Ok(rows)
}

fn proof_generator(kind: ProofKind) -> Arc<dyn ProofGenerator + Send + Sync> {
    match kind {
        ProofKind::Random => Arc::new(RandomProofGenerator),
        ProofKind::Digest => Arc::new(DigestProofGenerator),
    }
}

fn write_artifacts(config: &PipelineConfig, report: &BatchReport) -> Result<()> {
    let forecasts_path = config.output.forecasts_path();
    csv_io::write_forecasts_file(&forecasts_path, &report.forecasts())
        .with_context(|| format!("Failed to write {}", forecasts_path.display()))?;

    if let Some(json_path) = config.output.forecasts_json_path() {
        json_output::write_forecasts_file(&json_path, &report.forecasts())
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
    }

    let attestations_path = config.output.attestations_path();
    json_output::write_attestations_file(&attestations_path, &report.records())
        .with_context(|| format!("Failed to write {}", attestations_path.display()))?;
    Ok(())
}

fn print_text_summary(config: &PipelineConfig, report: &BatchReport) {
    println!(
        "Predictions saved to {} ({} records)",
        config.output.forecasts_path().display(),
        report.forecasts().len()
    );
    if let Some(json_path) = config.output.forecasts_json_path() {
        println!("Forecast JSON saved to {}", json_path.display());
    }
    println!(
        "Blockchain-ready data saved to {} ({} records)",
        config.output.attestations_path().display(),
        report.records().len()
    );
    for (node_id, err) in report.failures() {
        println!("Node {} failed: {}", node_id, err);
    }
    println!(
        "Completed: {} of {} nodes succeeded",
        report.success_count(),
        report.outcomes().len()
    );
}

fn print_json_summary(config: &PipelineConfig, report: &BatchReport) -> Result<()> {
    let nodes: Vec<serde_json::Value> = report
        .outcomes()
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(node) => serde_json::json!({
                "node_id": outcome.node_id,
                "status": "ok",
                "observations_used": node.observations_used,
                "profile_hours": node.profile.coverage(),
                "records": node.records.len(),
            }),
            Err(e) => serde_json::json!({
                "node_id": outcome.node_id,
                "status": "error",
                "error_kind": e.kind(),
                "error": e.to_string(),
            }),
        })
        .collect();

    let summary = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "forecasts_file": path_string(&config.output.forecasts_path()),
        "attestations_file": path_string(&config.output.attestations_path()),
        "records": report.records().len(),
        "nodes": nodes,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = load_config(&args)?;
    std::fs::create_dir_all(&config.output.dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.dir.display()
        )
    })?;

    let observations = load_observations(&args, &config)?;
    let store = TimeSeriesStore::from_observations(observations)
        .context("Failed to ingest observations")?;
    tracing::info!(
        "Ingested {} observations for {} nodes",
        store.len(),
        store.node_count()
    );

    let pipeline = ForecastPipeline::from_config(&config);
    let report = pipeline.run(Arc::new(store), proof_generator(config.proof));

    write_artifacts(&config, &report)?;

    match args.format {
        OutputFormat::Text => print_text_summary(&config, &report),
        OutputFormat::Json => print_json_summary(&config, &report)?,
    }

    if report.all_failed() {
        anyhow::bail!("Forecasting failed for every node");
    }

    Ok(())
}
