//! CLI argument parsing for PUE Oracle

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{PipelineConfig, ProofKind};
use crate::forecast::GapPolicy;

/// Output format for the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

/// Fallback when a forecast hour has no history
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GapPolicyArg {
    /// Fail the node
    Error,
    /// Use the nearest covered hour
    NearestHour,
    /// Use the mean of all covered hours
    GlobalMean,
}

impl From<GapPolicyArg> for GapPolicy {
    fn from(arg: GapPolicyArg) -> Self {
        match arg {
            GapPolicyArg::Error => GapPolicy::Error,
            GapPolicyArg::NearestHour => GapPolicy::NearestHour,
            GapPolicyArg::GlobalMean => GapPolicy::GlobalMean,
        }
    }
}

/// Proof attached to each attestation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProofArg {
    /// 32 random bytes (placeholder)
    Random,
    /// SHA-256 digest of the record fields
    Digest,
}

impl From<ProofArg> for ProofKind {
    fn from(arg: ProofArg) -> Self {
        match arg {
            ProofArg::Random => ProofKind::Random,
            ProofArg::Digest => ProofKind::Digest,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pue-oracle")]
#[command(version)]
#[command(about = "Forecast node PUE and emit ledger-ready attestation records", long_about = None)]
pub struct Cli {
    /// TOML configuration file (flags override its values)
    #[arg(short = 'C', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Observation table to ingest instead of generating synthetic data
    #[arg(short = 'i', long = "input", value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Days of synthetic history per node
    #[arg(long = "days", value_name = "DAYS")]
    pub days: Option<usize>,

    /// Number of synthetic nodes
    #[arg(long = "nodes", value_name = "N")]
    pub nodes: Option<usize>,

    /// Forecast horizon in hours
    #[arg(short = 'H', long = "horizon", value_name = "HOURS")]
    pub horizon: Option<usize>,

    /// Trailing observations used for the hourly profile
    #[arg(short = 'w', long = "window-size", value_name = "SIZE")]
    pub window_size: Option<usize>,

    /// Multiplicative forecast jitter stddev
    #[arg(long = "jitter", value_name = "SIGMA")]
    pub jitter: Option<f64>,

    /// Seed for jitter and synthetic data (reproducible runs)
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Policy for forecast hours missing from the profile
    #[arg(long = "gap-policy", value_enum)]
    pub gap_policy: Option<GapPolicyArg>,

    /// Proof generator for attestation records
    #[arg(long = "proof", value_enum)]
    pub proof: Option<ProofArg>,

    /// Forecast nodes on separate threads
    #[arg(long = "parallel")]
    pub parallel: bool,

    /// Per-node deadline in milliseconds (parallel mode)
    #[arg(long = "node-timeout-ms", value_name = "MS")]
    pub node_timeout_ms: Option<u64>,

    /// Directory for the generated artifacts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write the forecasts as JSON to FILE (inside the output directory)
    #[arg(long = "forecasts-json", value_name = "FILE")]
    pub forecasts_json: Option<String>,

    /// Summary format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Overlay command-line values onto a configuration
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(days) = self.days {
            config.synthetic.days = days;
        }
        if let Some(nodes) = self.nodes {
            config.synthetic.nodes = nodes;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(window_size) = self.window_size {
            config.window_size = window_size;
        }
        if let Some(jitter) = self.jitter {
            config.jitter_stddev = jitter;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(policy) = self.gap_policy {
            config.gap_policy = policy.into();
        }
        if let Some(proof) = self.proof {
            config.proof = proof.into();
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.node_timeout_ms.is_some() {
            config.node_timeout_ms = self.node_timeout_ms;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.forecasts_json.is_some() {
            config.output.forecasts_json_file = self.forecasts_json.clone();
        }
    }
}
