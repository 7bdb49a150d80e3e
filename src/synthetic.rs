//! Synthetic PUE telemetry
//!
//! Produces demo data with a known shape: each node has a base PUE
//! (`base_pue + node_step * index`) modulated by an hour-of-day sine, a
//! day-of-week sine and multiplicative Gaussian noise. With zero amplitudes
//! and zero noise every node reports its base PUE at every sample.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::noise::GaussianSource;
use crate::observation::Observation;

/// Shape of the generated telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    /// Days of history per node
    pub days: usize,
    /// Number of nodes (`node_0` .. `node_{n-1}`)
    pub nodes: usize,
    /// Samples per day, must divide 24
    pub samples_per_day: usize,
    /// Base PUE of `node_0`
    pub base_pue: f64,
    /// Base PUE increment per node index
    pub node_step: f64,
    /// Relative amplitude of the hour-of-day sine
    pub hour_amplitude: f64,
    /// Relative amplitude of the day-of-week sine
    pub day_amplitude: f64,
    /// Multiplicative noise stddev
    pub noise_sigma: f64,
    /// Timestamp of the last sample (`YYYY-MM-DD HH:MM:SS`); defaults to now
    pub end: Option<String>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            days: 30,
            nodes: 3,
            samples_per_day: 24,
            base_pue: 1.2,
            node_step: 0.1,
            hour_amplitude: 0.1,
            day_amplitude: 0.05,
            noise_sigma: 0.03,
            end: None,
        }
    }
}

impl SyntheticConfig {
    /// Flat, noise-free telemetry: every sample equals the node's base PUE
    pub fn flat(days: usize, nodes: usize) -> Self {
        Self {
            days,
            nodes,
            hour_amplitude: 0.0,
            day_amplitude: 0.0,
            noise_sigma: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(ForecastError::Config("synthetic.nodes must be >= 1".to_string()));
        }
        if self.days == 0 {
            return Err(ForecastError::Config("synthetic.days must be >= 1".to_string()));
        }
        if self.samples_per_day == 0 || 24 % self.samples_per_day != 0 {
            return Err(ForecastError::Config(format!(
                "synthetic.samples_per_day must divide 24, got {}",
                self.samples_per_day
            )));
        }
        if !self.base_pue.is_finite() || self.base_pue <= 0.0 {
            return Err(ForecastError::Config(format!(
                "synthetic.base_pue must be positive, got {}",
                self.base_pue
            )));
        }
        if !self.noise_sigma.is_finite() || self.noise_sigma < 0.0 {
            return Err(ForecastError::Config(format!(
                "synthetic.noise_sigma must be non-negative, got {}",
                self.noise_sigma
            )));
        }
        Ok(())
    }

    /// Timestamp of the last sample
    pub fn end_timestamp(&self) -> Result<NaiveDateTime> {
        match &self.end {
            Some(raw) => crate::observation::parse_timestamp(raw),
            None => Ok(current_hour()),
        }
    }

    /// Base PUE for a node index
    pub fn base_pue_for(&self, node_index: usize) -> f64 {
        self.base_pue + self.node_step * node_index as f64
    }
}

/// Local time truncated to the hour
fn current_hour() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.date()
        .and_hms_opt(now.hour(), 0, 0)
        .unwrap_or(now)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Generate `days * samples_per_day` observations per node, ascending in time
pub fn generate<G>(config: &SyntheticConfig, noise: &mut G) -> Result<Vec<Observation>>
where
    G: GaussianSource + ?Sized,
{
    config.validate()?;

    let end = config.end_timestamp()?;
    let step = Duration::hours((24 / config.samples_per_day) as i64);
    let samples = config.days * config.samples_per_day;

    let mut rows = Vec::with_capacity(samples * config.nodes);
    for node_index in 0..config.nodes {
        let node_id = format!("node_{}", node_index);
        let base = config.base_pue_for(node_index);

        for k in 0..samples {
            let ts = end - step * (samples - 1 - k) as i32;
            let hour_wave = (ts.hour() as f64 * PI / 12.0).sin();
            let day_wave = (ts.weekday().num_days_from_monday() as f64 * PI / 3.5).sin();

            let hour_factor = 1.0 + config.hour_amplitude * hour_wave;
            let day_factor = 1.0 + config.day_amplitude * day_wave;
            let random_factor = 1.0 + config.noise_sigma * noise.next_gaussian();
            let pue = round_to(base * hour_factor * day_factor * random_factor, 3).max(0.001);

            let cooling = round_to(100.0 + 20.0 * hour_wave + 10.0 * noise.next_gaussian(), 1);
            let compute = round_to(80.0 + 15.0 * hour_wave + 5.0 * noise.next_gaussian(), 1);

            rows.push(Observation::new(ts, node_id.clone(), pue, cooling, compute)?);
        }
    }

    tracing::debug!(
        "Generated {} synthetic observations for {} nodes",
        rows.len(),
        config.nodes
    );
    Ok(rows)
}
