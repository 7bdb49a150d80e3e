//! Gaussian noise sources
//!
//! Forecast jitter and synthetic telemetry both draw standard normal samples.
//! Components take the source as a capability so tests can plug in a silent
//! or seeded source instead of process-global randomness.

use std::hash::Hasher;

use fnv::FnvHasher;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Capability producing standard normal samples (mean 0, stddev 1)
pub trait GaussianSource {
    /// Draw the next sample
    fn next_gaussian(&mut self) -> f64;
}

impl<G: GaussianSource + ?Sized> GaussianSource for &mut G {
    fn next_gaussian(&mut self) -> f64 {
        (**self).next_gaussian()
    }
}

impl<G: GaussianSource + ?Sized> GaussianSource for Box<G> {
    fn next_gaussian(&mut self) -> f64 {
        (**self).next_gaussian()
    }
}

/// Source that always returns 0.0
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl GaussianSource for ZeroNoise {
    fn next_gaussian(&mut self) -> f64 {
        0.0
    }
}

/// Box-Muller transform over any uniform RNG
#[derive(Debug, Clone)]
pub struct RngGaussian<R: Rng> {
    rng: R,
    spare: Option<f64>,
}

impl<R: Rng> RngGaussian<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, spare: None }
    }
}

impl RngGaussian<StdRng> {
    /// Reproducible source for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Non-reproducible source seeded from the OS
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> GaussianSource for RngGaussian<R> {
    fn next_gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare.take() {
            return spare;
        }

        // u1 in (0, 1] keeps ln() finite
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;

        self.spare = Some(radius * theta.sin());
        radius * theta.cos()
    }
}

/// Per-node source: seeded from `seed` mixed with the node id, or from entropy
pub fn source_for_node(seed: Option<u64>, node_id: &str) -> Box<dyn GaussianSource + Send> {
    match seed {
        Some(seed) => Box::new(RngGaussian::seeded(seed ^ node_hash(node_id))),
        None => Box::new(RngGaussian::from_entropy()),
    }
}

/// FNV hash of the node id, stable across processes
fn node_hash(node_id: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(node_id.as_bytes());
    hasher.finish()
}
