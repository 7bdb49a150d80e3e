//! Pipeline configuration
//!
//! Every tunable the pipeline uses is passed in explicitly through
//! [`PipelineConfig`]. Values can come from a TOML file; any missing key
//! falls back to its default.
//!
//! # Example
//! ```
//! use pue_oracle::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml_str("horizon = 48\nseed = 7").unwrap();
//! assert_eq!(config.horizon, 48);
//! assert_eq!(config.window_size, 168);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::forecast::{GapPolicy, DEFAULT_HORIZON, DEFAULT_JITTER_STDDEV};
use crate::profile::DEFAULT_WINDOW_SIZE;
use crate::synthetic::SyntheticConfig;

/// Which proof generator to attach to attestation records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// 32 random bytes per record
    #[default]
    Random,
    /// SHA-256 over the record fields
    Digest,
}

/// Where the artifacts of a run are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub observations_file: String,
    pub forecasts_file: String,
    pub attestations_file: String,
    /// Optional JSON copy of the forecasts
    pub forecasts_json_file: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            observations_file: "sample_energy_data.csv".to_string(),
            forecasts_file: "predicted_pue_values.csv".to_string(),
            attestations_file: "blockchain_ready_data.json".to_string(),
            forecasts_json_file: None,
        }
    }
}

impl OutputConfig {
    pub fn observations_path(&self) -> PathBuf {
        self.dir.join(&self.observations_file)
    }

    pub fn forecasts_path(&self) -> PathBuf {
        self.dir.join(&self.forecasts_file)
    }

    pub fn attestations_path(&self) -> PathBuf {
        self.dir.join(&self.attestations_file)
    }

    pub fn forecasts_json_path(&self) -> Option<PathBuf> {
        self.forecasts_json_file.as_ref().map(|file| self.dir.join(file))
    }
}

/// Configuration of a forecast + attestation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trailing observations used for the hourly profile
    pub window_size: usize,
    /// Forecast horizon in hours
    pub horizon: usize,
    /// Multiplicative jitter stddev (0 disables jitter)
    pub jitter_stddev: f64,
    /// Seed for jitter and synthetic data; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Behavior for forecast hours missing from the profile
    pub gap_policy: GapPolicy,
    /// Proof generator for attestation records
    pub proof: ProofKind,
    /// Run nodes on separate threads
    pub parallel: bool,
    /// Per-node deadline in parallel mode
    pub node_timeout_ms: Option<u64>,
    pub synthetic: SyntheticConfig,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            horizon: DEFAULT_HORIZON,
            jitter_stddev: DEFAULT_JITTER_STDDEV,
            seed: None,
            gap_policy: GapPolicy::Error,
            proof: ProofKind::Random,
            parallel: false,
            node_timeout_ms: None,
            synthetic: SyntheticConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ForecastError::Parse {
            line: e
                .span()
                .and_then(|span| raw.get(..span.start))
                .map(|prefix| prefix.matches('\n').count() + 1)
                .unwrap_or(0),
            message: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ForecastError::Config("window_size must be >= 1".to_string()));
        }
        if self.horizon == 0 {
            return Err(ForecastError::Config("horizon must be >= 1".to_string()));
        }
        if !self.jitter_stddev.is_finite() || self.jitter_stddev < 0.0 {
            return Err(ForecastError::Config(format!(
                "jitter_stddev must be a non-negative finite number, got {}",
                self.jitter_stddev
            )));
        }
        if self.node_timeout_ms == Some(0) {
            return Err(ForecastError::Config(
                "node_timeout_ms must be > 0 when set".to_string(),
            ));
        }
        self.synthetic.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.window_size, 168);
        assert_eq!(config.horizon, 24);
        assert_eq!(config.jitter_stddev, 0.02);
        assert_eq!(config.gap_policy, GapPolicy::Error);
        assert_eq!(config.proof, ProofKind::Random);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_overrides_and_nested_tables() {
        let raw = r#"
            jitter_stddev = 0.0
            gap_policy = "global_mean"
            proof = "digest"
            parallel = true
            node_timeout_ms = 500

            [synthetic]
            days = 7
            noise_sigma = 0.0

            [output]
            dir = "out"
            attestations_file = "records.json"
        "#;
        let config = PipelineConfig::from_toml_str(raw).unwrap();

        assert_eq!(config.jitter_stddev, 0.0);
        assert_eq!(config.gap_policy, GapPolicy::GlobalMean);
        assert_eq!(config.proof, ProofKind::Digest);
        assert!(config.parallel);
        assert_eq!(config.node_timeout_ms, Some(500));
        assert_eq!(config.synthetic.days, 7);
        assert_eq!(config.synthetic.nodes, 3);
        assert_eq!(
            config.output.attestations_path(),
            PathBuf::from("out").join("records.json")
        );
        assert_eq!(config.output.forecasts_file, "predicted_pue_values.csv");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_toml_str("horizon = 0").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));

        let err = PipelineConfig::from_toml_str("jitter_stddev = -0.1").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));

        let err = PipelineConfig::from_toml_str("[synthetic]\nsamples_per_day = 7").unwrap_err();
        assert!(matches!(err, ForecastError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = PipelineConfig::from_toml_str("horizon = \"many\"").unwrap_err();
        assert!(matches!(err, ForecastError::Parse { .. }));
    }

    #[test]
    fn test_unknown_gap_policy_is_parse_error() {
        let err = PipelineConfig::from_toml_str("gap_policy = \"guess\"").unwrap_err();
        assert!(matches!(err, ForecastError::Parse { .. }));
    }
}
