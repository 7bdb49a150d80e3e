//! Hour-of-day seasonal profile estimation
//!
//! The profile is the mean PUE for each hour of the day over a trailing window
//! of observations (one week of hourly samples by default). Hours that never
//! occur inside the window are simply absent from the profile.

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::Serialize;

use crate::error::{ForecastError, Result};
use crate::observation::Observation;

/// Default trailing window: 7 days of hourly samples
pub const DEFAULT_WINDOW_SIZE: usize = 7 * 24;

/// Mean PUE per hour of day (0-23)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyProfile {
    means: BTreeMap<u32, f64>,
    samples: BTreeMap<u32, usize>,
}

impl HourlyProfile {
    /// Build a profile directly from hour means (each hour counted as one sample)
    pub fn from_means<I>(means: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        let means: BTreeMap<u32, f64> = means.into_iter().filter(|(h, _)| *h < 24).collect();
        let samples = means.keys().map(|h| (*h, 1)).collect();
        Self { means, samples }
    }

    /// Mean PUE for `hour`, if the window covered it
    pub fn get(&self, hour: u32) -> Option<f64> {
        self.means.get(&hour).copied()
    }

    /// Number of observations that contributed to `hour`
    pub fn sample_count(&self, hour: u32) -> usize {
        self.samples.get(&hour).copied().unwrap_or(0)
    }

    /// Covered hours in ascending order
    pub fn hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.means.keys().copied()
    }

    /// Number of covered hours
    pub fn coverage(&self) -> usize {
        self.means.len()
    }

    /// True when all 24 hours are covered
    pub fn is_complete(&self) -> bool {
        self.means.len() == 24
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Mean of the covered hour means
    pub fn global_mean(&self) -> Option<f64> {
        if self.means.is_empty() {
            return None;
        }
        Some(self.means.values().sum::<f64>() / self.means.len() as f64)
    }

    /// Covered hour closest to `hour` on the 24-hour clock; earlier hour wins ties
    pub fn nearest_covered_hour(&self, hour: u32) -> Option<u32> {
        let hour = hour % 24;
        (0..=12).find_map(|offset| {
            let before = (hour + 24 - offset) % 24;
            if self.means.contains_key(&before) {
                return Some(before);
            }
            let after = (hour + offset) % 24;
            self.means.contains_key(&after).then_some(after)
        })
    }
}

/// Computes hour-of-day profiles over a trailing window
#[derive(Debug, Clone, Copy)]
pub struct SeasonalProfileEstimator {
    window_size: usize,
}

impl Default for SeasonalProfileEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl SeasonalProfileEstimator {
    /// Create an estimator using the last `window_size` observations
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Estimate the profile from a timestamp-ordered observation sequence
    ///
    /// Shorter histories than the window yield a degraded but valid profile.
    pub fn estimate(&self, observations: &[Observation]) -> Result<HourlyProfile> {
        if observations.is_empty() {
            return Err(ForecastError::InsufficientData(0));
        }

        let start = observations.len().saturating_sub(self.window_size);
        let window = &observations[start..];

        if window.len() < self.window_size {
            tracing::debug!(
                "Degraded profile: {} of {} observations available",
                window.len(),
                self.window_size
            );
        }

        let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for obs in window {
            let entry = sums.entry(obs.timestamp.hour()).or_insert((0.0, 0));
            entry.0 += obs.pue;
            entry.1 += 1;
        }

        let means = sums
            .iter()
            .map(|(hour, (sum, count))| (*hour, sum / *count as f64))
            .collect();
        let samples = sums.iter().map(|(hour, (_, count))| (*hour, *count)).collect();

        Ok(HourlyProfile { means, samples })
    }
}
