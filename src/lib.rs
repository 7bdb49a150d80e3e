//! PUE Oracle - seasonal PUE forecasting with ledger-ready attestations
//!
//! This library ingests per-node power-usage-effectiveness telemetry, builds
//! an hour-of-day profile per node, forecasts the next hours from that profile
//! and packages each forecast point as a fixed-point attestation record with
//! an opaque proof attached.

pub mod attestation;
pub mod cli;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod forecast;
pub mod json_output;
pub mod noise;
pub mod observation;
pub mod pipeline;
pub mod profile;
pub mod store;
pub mod synthetic;

pub use error::{ForecastError, Result};
