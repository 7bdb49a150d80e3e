//! Seasonal forecaster
//!
//! Projects an hourly profile forward hour by hour and applies multiplicative
//! Gaussian jitter: `predicted = profile[hour] * (1 + stddev * N(0, 1))`.
//! Every run draws fresh noise unless the caller supplies a seeded or silent
//! [`GaussianSource`].

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::noise::GaussianSource;
use crate::observation::timestamp_serde;
use crate::profile::HourlyProfile;

/// Default multiplicative jitter
pub const DEFAULT_JITTER_STDDEV: f64 = 0.02;

/// Default forecast horizon in hours
pub const DEFAULT_HORIZON: usize = 24;

/// Floor applied to jittered predictions so they stay encodable
pub const MIN_PREDICTED_PUE: f64 = 0.001;

/// What to do when a forecast hour has no historical coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Fail with `ProfileGap`
    #[default]
    Error,
    /// Use the closest covered hour on the 24-hour clock
    NearestHour,
    /// Use the mean of all covered hours
    GlobalMean,
}

/// One predicted PUE value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(with = "timestamp_serde")]
    pub timestamp: NaiveDateTime,
    pub node_id: String,
    pub predicted_pue: f64,
}

/// Hour-of-day profile forecaster
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    jitter_stddev: f64,
    gap_policy: GapPolicy,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(DEFAULT_JITTER_STDDEV)
    }
}

impl Forecaster {
    pub fn new(jitter_stddev: f64) -> Self {
        Self {
            jitter_stddev,
            gap_policy: GapPolicy::Error,
        }
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    pub fn jitter_stddev(&self) -> f64 {
        self.jitter_stddev
    }

    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    /// Forecast `horizon` hourly points starting one hour after `last_timestamp`
    pub fn forecast<G>(
        &self,
        profile: &HourlyProfile,
        last_timestamp: NaiveDateTime,
        node_id: &str,
        horizon: usize,
        noise: &mut G,
    ) -> Result<Vec<ForecastPoint>>
    where
        G: GaussianSource + ?Sized,
    {
        if horizon == 0 {
            return Err(ForecastError::Validation(
                "forecast horizon must be positive".to_string(),
            ));
        }
        if !self.jitter_stddev.is_finite() || self.jitter_stddev < 0.0 {
            return Err(ForecastError::Validation(format!(
                "jitter stddev must be a non-negative finite number, got {}",
                self.jitter_stddev
            )));
        }

        let mut points = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let timestamp = last_timestamp + Duration::hours(step as i64);
            let baseline = self.baseline_for(profile, timestamp.hour(), node_id)?;

            let jitter = 1.0 + self.jitter_stddev * noise.next_gaussian();
            let predicted_pue = (baseline * jitter).max(MIN_PREDICTED_PUE);

            points.push(ForecastPoint {
                timestamp,
                node_id: node_id.to_string(),
                predicted_pue,
            });
        }

        tracing::debug!(
            "Forecast {} points for {} from {}",
            points.len(),
            node_id,
            last_timestamp
        );
        Ok(points)
    }

    fn baseline_for(&self, profile: &HourlyProfile, hour: u32, node_id: &str) -> Result<f64> {
        if let Some(mean) = profile.get(hour) {
            return Ok(mean);
        }

        let fallback = match self.gap_policy {
            GapPolicy::Error => None,
            GapPolicy::NearestHour => profile
                .nearest_covered_hour(hour)
                .and_then(|h| profile.get(h)),
            GapPolicy::GlobalMean => profile.global_mean(),
        };

        fallback.ok_or_else(|| ForecastError::ProfileGap {
            node_id: node_id.to_string(),
            hour,
        })
    }
}
