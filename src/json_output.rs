//! JSON export of attestation record sets and forecasts
//!
//! Records are written as a plain JSON array, pretty-printed with two-space
//! indentation, one element per forecast point in pipeline order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::attestation::AttestationRecord;
use crate::error::{ForecastError, Result};
use crate::forecast::ForecastPoint;

fn to_io(err: serde_json::Error) -> ForecastError {
    ForecastError::Io(err.into())
}

/// Serialize records as a pretty JSON array
pub fn attestations_to_string(records: &[AttestationRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(to_io)
}

/// Write records as a pretty JSON array
pub fn write_attestations<W: Write>(writer: &mut W, records: &[AttestationRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, records).map_err(to_io)?;
    writeln!(writer)?;
    Ok(())
}

/// Write records to `path`, flushing before returning
pub fn write_attestations_file(path: &Path, records: &[AttestationRecord]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_attestations(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Read a record set written by [`write_attestations`]
pub fn read_attestations<R: Read>(reader: R) -> Result<Vec<AttestationRecord>> {
    serde_json::from_reader(reader).map_err(|e| ForecastError::Parse {
        line: e.line(),
        message: e.to_string(),
    })
}

/// Read a record set from `path`
pub fn read_attestations_file(path: &Path) -> Result<Vec<AttestationRecord>> {
    read_attestations(BufReader::new(File::open(path)?))
}

/// Write forecasts as a pretty JSON array
pub fn write_forecasts<W: Write>(writer: &mut W, points: &[ForecastPoint]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, points).map_err(to_io)?;
    writeln!(writer)?;
    Ok(())
}

/// Write forecasts to `path`, flushing before returning
pub fn write_forecasts_file(path: &Path, points: &[ForecastPoint]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_forecasts(&mut writer, points)?;
    writer.flush()?;
    Ok(())
}
