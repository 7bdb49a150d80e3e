//! CSV input/output for observation tables and forecasts
//!
//! Observation tables use the header
//! `timestamp,node_id,pue,cooling_load,compute_load`; forecasts use
//! `timestamp,node_id,predicted_pue`. Numbers are written with the same
//! precision the telemetry arrives in (PUE 3 decimals, loads 1 decimal).

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::StringRecord;

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastPoint;
use crate::observation::{format_timestamp, Observation};

/// Header row of an observation table
pub const OBSERVATION_HEADER: &str = "timestamp,node_id,pue,cooling_load,compute_load";

/// Header row of a forecast export
pub const FORECAST_HEADER: &str = "timestamp,node_id,predicted_pue";

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn parse_number(raw: &str, column: &str, line: usize) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| ForecastError::Parse {
        line,
        message: format!("invalid {} '{}'", column, raw),
    })
}

/// Reader settings shared by whole tables and single rows
fn table_reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.flexible(true).trim(csv::Trim::All);
    builder
}

fn csv_error(err: csv::Error, line: usize) -> ForecastError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => ForecastError::Io(e),
        _ => ForecastError::Parse { line, message },
    }
}

/// Convert one data record (`line` is 1-based, for errors)
fn parse_record(record: &StringRecord, line: usize) -> Result<Observation> {
    if record.len() != 5 {
        return Err(ForecastError::Parse {
            line,
            message: format!("expected 5 fields, found {}", record.len()),
        });
    }

    let pue = parse_number(&record[2], "pue", line)?;
    let cooling_load = parse_number(&record[3], "cooling_load", line)?;
    let compute_load = parse_number(&record[4], "compute_load", line)?;

    Observation::parse(&record[0], &record[1], pue, cooling_load, compute_load).map_err(
        |e| match e {
            ForecastError::Validation(message) => ForecastError::Validation(format!(
                "line {}: {}",
                line, message
            )),
            other => other,
        },
    )
}

/// Parse one data row of an observation table (`line` is 1-based, for errors)
pub fn parse_observation_line(raw: &str, line: usize) -> Result<Observation> {
    let mut reader = table_reader()
        .has_headers(false)
        .from_reader(raw.as_bytes());
    let mut record = StringRecord::new();

    let found = reader
        .read_record(&mut record)
        .map_err(|e| csv_error(e, line))?;
    if !found {
        return Err(ForecastError::Parse {
            line,
            message: "empty row".to_string(),
        });
    }
    parse_record(&record, line)
}

/// Read an observation table with header
///
/// Quoted fields may span lines; errors carry the line a record starts on.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut reader = table_reader().from_reader(reader);

    let header = reader.headers().map_err(|e| csv_error(e, 1))?;
    if header.is_empty() {
        return Err(ForecastError::Parse {
            line: 1,
            message: "missing header".to_string(),
        });
    }
    let expected = OBSERVATION_HEADER.split(',');
    if !header
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}'))
        .eq(expected)
    {
        return Err(ForecastError::Parse {
            line: 1,
            message: format!("expected header '{}'", OBSERVATION_HEADER),
        });
    }

    let mut observations = Vec::new();
    let mut record = StringRecord::new();
    loop {
        let found = reader.read_record(&mut record).map_err(|e| {
            let line = e.position().map_or(0, |p| p.line() as usize);
            csv_error(e, line)
        })?;
        if !found {
            break;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        observations.push(parse_record(&record, line)?);
    }
    Ok(observations)
}

/// Read an observation table from disk
pub fn read_observations_file(path: &Path) -> Result<Vec<Observation>> {
    let file = File::open(path)?;
    read_observations(BufReader::new(file))
}

/// Write an observation table with header
pub fn write_observations<'a, W, I>(writer: &mut W, observations: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Observation>,
{
    writeln!(writer, "{}", OBSERVATION_HEADER)?;
    for obs in observations {
        writeln!(
            writer,
            "{},{},{:.3},{:.1},{:.1}",
            format_timestamp(&obs.timestamp),
            escape_field(&obs.node_id),
            obs.pue,
            obs.cooling_load,
            obs.compute_load
        )?;
    }
    Ok(())
}

/// Write forecasts with header
pub fn write_forecasts<'a, W, I>(writer: &mut W, points: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ForecastPoint>,
{
    writeln!(writer, "{}", FORECAST_HEADER)?;
    for point in points {
        writeln!(
            writer,
            "{},{},{:.3}",
            format_timestamp(&point.timestamp),
            escape_field(&point.node_id),
            point.predicted_pue
        )?;
    }
    Ok(())
}

/// Write an observation table to `path`, flushing before returning
pub fn write_observations_file<'a, I>(path: &Path, observations: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_observations(&mut writer, observations)?;
    writer.flush()?;
    Ok(())
}

/// Write forecasts to `path`, flushing before returning
pub fn write_forecasts_file<'a, I>(path: &Path, points: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ForecastPoint>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write_forecasts(&mut writer, points)?;
    writer.flush()?;
    Ok(())
}
