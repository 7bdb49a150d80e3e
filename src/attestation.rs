//! Ledger-ready attestation records
//!
//! Each forecast point becomes a record carrying the PUE as a fixed-point
//! integer (scale 1000) and an opaque proof. Proofs come from an injected
//! [`ProofGenerator`]; the builder never inspects them and never retries.

use std::fmt;

use chrono::NaiveDateTime;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{BoxedSourceError, ForecastError, Result};
use crate::forecast::ForecastPoint;
use crate::observation::{format_timestamp, timestamp_serde};

/// Fixed-point scale applied to PUE values
pub const PUE_SCALE: f64 = 1000.0;

/// Size of the placeholder proof in bytes
pub const PLACEHOLDER_PROOF_LEN: usize = 32;

/// Encode a PUE value as `round(value * 1000)`
pub fn encode_fixed_point(value: f64) -> Result<u32> {
    if !value.is_finite() {
        return Err(ForecastError::Encoding {
            value,
            reason: "value is not finite".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ForecastError::Encoding {
            value,
            reason: "value is negative".to_string(),
        });
    }

    let scaled = (value * PUE_SCALE).round();
    if scaled > f64::from(u32::MAX) {
        return Err(ForecastError::Encoding {
            value,
            reason: format!("scaled value {} exceeds u32 range", scaled),
        });
    }
    Ok(scaled as u32)
}

/// Decode a fixed-point PUE value
pub fn decode_fixed_point(value: u32) -> f64 {
    f64::from(value) / PUE_SCALE
}

/// Opaque proof bytes, rendered as `0x`-prefixed lowercase hex
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn from_hex(raw: &str) -> std::result::Result<Self, hex::FromHexError> {
        let digits = raw.strip_prefix("0x").unwrap_or(raw);
        hex::decode(digits).map(Self)
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({})", self.to_hex())
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Proof::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// External proof-generation capability
///
/// Implementations may be slow or fail; failures are reported as-is.
pub trait ProofGenerator {
    fn generate(
        &self,
        timestamp: &NaiveDateTime,
        node_id: &str,
        pue_value: u32,
    ) -> std::result::Result<Proof, BoxedSourceError>;
}

impl<P: ProofGenerator + ?Sized> ProofGenerator for &P {
    fn generate(
        &self,
        timestamp: &NaiveDateTime,
        node_id: &str,
        pue_value: u32,
    ) -> std::result::Result<Proof, BoxedSourceError> {
        (**self).generate(timestamp, node_id, pue_value)
    }
}

impl<P: ProofGenerator + ?Sized> ProofGenerator for std::sync::Arc<P> {
    fn generate(
        &self,
        timestamp: &NaiveDateTime,
        node_id: &str,
        pue_value: u32,
    ) -> std::result::Result<Proof, BoxedSourceError> {
        (**self).generate(timestamp, node_id, pue_value)
    }
}

/// Placeholder proof: 32 random bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomProofGenerator;

impl ProofGenerator for RandomProofGenerator {
    fn generate(
        &self,
        _timestamp: &NaiveDateTime,
        _node_id: &str,
        _pue_value: u32,
    ) -> std::result::Result<Proof, BoxedSourceError> {
        let mut bytes = vec![0u8; PLACEHOLDER_PROOF_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Proof(bytes))
    }
}

/// Deterministic proof: SHA-256 of `timestamp|node_id|pue_value`
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProofGenerator;

impl ProofGenerator for DigestProofGenerator {
    fn generate(
        &self,
        timestamp: &NaiveDateTime,
        node_id: &str,
        pue_value: u32,
    ) -> std::result::Result<Proof, BoxedSourceError> {
        let mut hasher = Sha256::new();
        hasher.update(format_timestamp(timestamp).as_bytes());
        hasher.update(b"|");
        hasher.update(node_id.as_bytes());
        hasher.update(b"|");
        hasher.update(pue_value.to_string().as_bytes());
        Ok(Proof(hasher.finalize().to_vec()))
    }
}

/// Exportable attestation for one forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationRecord {
    #[serde(with = "timestamp_serde")]
    pub timestamp: NaiveDateTime,
    pub node_id: String,
    /// PUE × 1000, rounded
    pub pue_value: u32,
    pub proof: Proof,
}

/// Turns forecast points into attestation records
#[derive(Debug, Clone, Copy, Default)]
pub struct AttestationBuilder;

impl AttestationBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build one record per point, preserving order
    ///
    /// Stops at the first encoding or proof failure.
    pub fn build<P>(&self, points: &[ForecastPoint], prover: &P) -> Result<Vec<AttestationRecord>>
    where
        P: ProofGenerator + ?Sized,
    {
        points
            .iter()
            .map(|point| self.build_one(point, prover))
            .collect()
    }

    fn build_one<P>(&self, point: &ForecastPoint, prover: &P) -> Result<AttestationRecord>
    where
        P: ProofGenerator + ?Sized,
    {
        let pue_value = encode_fixed_point(point.predicted_pue)?;
        let proof = prover
            .generate(&point.timestamp, &point.node_id, pue_value)
            .map_err(|source| ForecastError::ProofGeneration {
                node_id: point.node_id.clone(),
                source,
            })?;

        Ok(AttestationRecord {
            timestamp: point.timestamp,
            node_id: point.node_id.clone(),
            pue_value,
            proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::parse_timestamp;
    use std::cell::Cell;

    fn point(ts: &str, node: &str, pue: f64) -> ForecastPoint {
        ForecastPoint {
            timestamp: parse_timestamp(ts).unwrap(),
            node_id: node.to_string(),
            predicted_pue: pue,
        }
    }

    /// Fails on the n-th call (0-based)
    struct FailingProver {
        fail_at: usize,
        calls: Cell<usize>,
    }

    impl ProofGenerator for FailingProver {
        fn generate(
            &self,
            _timestamp: &NaiveDateTime,
            _node_id: &str,
            _pue_value: u32,
        ) -> std::result::Result<Proof, BoxedSourceError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if call == self.fail_at {
                Err("prover unavailable".into())
            } else {
                Ok(Proof::new(vec![0xab]))
            }
        }
    }

    #[test]
    fn test_encode_fixed_point() {
        assert_eq!(encode_fixed_point(1.234).unwrap(), 1234);
        assert_eq!(encode_fixed_point(1.2).unwrap(), 1200);
        assert_eq!(encode_fixed_point(1.2346).unwrap(), 1235);
        assert_eq!(encode_fixed_point(0.0).unwrap(), 0);
    }

    #[test]
    fn test_encode_rejects_negative_and_non_finite() {
        assert!(matches!(
            encode_fixed_point(-0.5),
            Err(ForecastError::Encoding { .. })
        ));
        assert!(matches!(
            encode_fixed_point(f64::NAN),
            Err(ForecastError::Encoding { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_overflow() {
        let too_big = f64::from(u32::MAX) / PUE_SCALE + 1.0;
        assert!(matches!(
            encode_fixed_point(too_big),
            Err(ForecastError::Encoding { .. })
        ));
    }

    #[test]
    fn test_build_preserves_order_and_values() {
        let points = vec![
            point("2024-01-01 01:00:00", "node_0", 1.234),
            point("2024-01-01 02:00:00", "node_0", 1.3),
        ];
        let records = AttestationBuilder::new()
            .build(&points, &DigestProofGenerator)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pue_value, 1234);
        assert_eq!(records[1].pue_value, 1300);
        assert_eq!(records[1].timestamp, points[1].timestamp);
        assert_eq!(records[0].proof.as_bytes().len(), 32);
    }

    #[test]
    fn test_digest_prover_is_deterministic() {
        let points = vec![point("2024-01-01 01:00:00", "node_1", 1.31)];
        let builder = AttestationBuilder::new();
        let a = builder.build(&points, &DigestProofGenerator).unwrap();
        let b = builder.build(&points, &DigestProofGenerator).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_prover_changes_only_proof() {
        let points = vec![point("2024-01-01 01:00:00", "node_1", 1.31)];
        let builder = AttestationBuilder::new();
        let a = builder.build(&points, &RandomProofGenerator).unwrap();
        let b = builder.build(&points, &RandomProofGenerator).unwrap();

        assert_eq!(a[0].pue_value, b[0].pue_value);
        assert_eq!(a[0].node_id, b[0].node_id);
        assert_eq!(a[0].proof.as_bytes().len(), PLACEHOLDER_PROOF_LEN);
        assert_ne!(a[0].proof, b[0].proof);
    }

    #[test]
    fn test_proof_failure_is_propagated_without_retry() {
        let points = vec![
            point("2024-01-01 01:00:00", "node_2", 1.4),
            point("2024-01-01 02:00:00", "node_2", 1.4),
            point("2024-01-01 03:00:00", "node_2", 1.4),
        ];
        let prover = FailingProver {
            fail_at: 1,
            calls: Cell::new(0),
        };

        let err = AttestationBuilder::new().build(&points, &prover).unwrap_err();
        assert!(matches!(err, ForecastError::ProofGeneration { ref node_id, .. } if node_id == "node_2"));
        assert_eq!(prover.calls.get(), 2);
    }

    #[test]
    fn test_negative_prediction_is_encoding_error() {
        let points = vec![point("2024-01-01 01:00:00", "node_0", -1.0)];
        let err = AttestationBuilder::new()
            .build(&points, &DigestProofGenerator)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Encoding { .. }));
    }

    #[test]
    fn test_record_json_shape() {
        let record = AttestationRecord {
            timestamp: parse_timestamp("2024-01-01 01:00:00").unwrap(),
            node_id: "node_0".to_string(),
            pue_value: 1200,
            proof: Proof::new(vec![0x0f, 0xa0]),
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["timestamp"], "2024-01-01 01:00:00");
        assert_eq!(json["pue_value"], 1200);
        assert_eq!(json["proof"], "0x0fa0");

        let back: AttestationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
