//! Telemetry observations for a single compute node
//!
//! Observations arrive as `{timestamp, node_id, pue, cooling_load, compute_load}`
//! rows. Timestamps use the `YYYY-MM-DD HH:MM:SS` format on the way in and on
//! the way out.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Wire format for every timestamp in the pipeline
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        ForecastError::Validation(format!("unparsable timestamp '{}': {}", raw.trim(), e))
    })
}

/// Format a timestamp in the wire format
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for timestamps in the wire format
pub mod timestamp_serde {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// A single PUE telemetry sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// When the sample was taken
    #[serde(with = "timestamp_serde")]
    pub timestamp: NaiveDateTime,
    /// Reporting node (e.g. `node_0`)
    pub node_id: String,
    /// Power usage effectiveness, always > 0
    pub pue: f64,
    /// Cooling load at sample time
    pub cooling_load: f64,
    /// Compute load at sample time
    pub compute_load: f64,
}

impl Observation {
    /// Create a validated observation
    pub fn new(
        timestamp: NaiveDateTime,
        node_id: impl Into<String>,
        pue: f64,
        cooling_load: f64,
        compute_load: f64,
    ) -> Result<Self> {
        let obs = Self {
            timestamp,
            node_id: node_id.into(),
            pue,
            cooling_load,
            compute_load,
        };
        obs.validate()?;
        Ok(obs)
    }

    /// Create a validated observation from a wire-format timestamp
    pub fn parse(
        timestamp: &str,
        node_id: impl Into<String>,
        pue: f64,
        cooling_load: f64,
        compute_load: f64,
    ) -> Result<Self> {
        Self::new(
            parse_timestamp(timestamp)?,
            node_id,
            pue,
            cooling_load,
            compute_load,
        )
    }

    /// Check the invariants every stored observation must satisfy
    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(ForecastError::Validation(
                "node_id must not be empty".to_string(),
            ));
        }
        if !self.pue.is_finite() || self.pue <= 0.0 {
            return Err(ForecastError::Validation(format!(
                "pue must be a positive finite number, got {} for node '{}'",
                self.pue, self.node_id
            )));
        }
        if !self.cooling_load.is_finite() || !self.compute_load.is_finite() {
            return Err(ForecastError::Validation(format!(
                "loads must be finite for node '{}'",
                self.node_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timestamp_roundtrip_format() {
        let ts = parse_timestamp("2024-03-05 17:45:09").unwrap();
        assert_eq!(ts.hour(), 17);
        assert_eq!(format_timestamp(&ts), "2024-03-05 17:45:09");
    }

    #[test]
    fn test_parse_timestamp_rejects_iso_t_separator() {
        let err = parse_timestamp("2024-03-05T17:45:09").unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn test_observation_rejects_non_positive_pue() {
        for pue in [0.0, -1.2, f64::NAN, f64::INFINITY] {
            let result = Observation::parse("2024-01-01 00:00:00", "node_0", pue, 100.0, 80.0);
            assert!(
                matches!(result, Err(ForecastError::Validation(_))),
                "pue {} should be rejected",
                pue
            );
        }
    }

    #[test]
    fn test_observation_rejects_empty_node() {
        let result = Observation::parse("2024-01-01 00:00:00", "  ", 1.2, 100.0, 80.0);
        assert!(matches!(result, Err(ForecastError::Validation(_))));
    }

    #[test]
    fn test_observation_json_uses_wire_timestamp() {
        let obs = Observation::parse("2024-01-01 06:00:00", "node_2", 1.412, 101.5, 79.0).unwrap();
        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"timestamp\":\"2024-01-01 06:00:00\""));

        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obs);
    }
}
