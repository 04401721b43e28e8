/// Reading samples back from the daily CSV logs
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::SinkError;
use crate::models::{CanonicalField, Measurements, RawSample};
use crate::storage::csv_log::{MISSING_VALUE, TIME_COLUMN};
use crate::storage::retention::daily_log_files;

/// Load every sample stored in one daily log
pub fn read_file(path: &Path) -> Result<Vec<RawSample>, SinkError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<Option<CanonicalField>> = reader
        .headers()?
        .iter()
        .map(CanonicalField::from_name)
        .collect();
    let time_index = reader
        .headers()?
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| SinkError::InvalidRow(format!("{} has no time column", path.display())))?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let stamp = record.get(time_index).unwrap_or_default();
        let time = OffsetDateTime::parse(stamp, &Rfc3339)
            .map_err(|e| SinkError::InvalidRow(format!("bad time '{}': {}", stamp, e)))?;

        let mut values = Measurements::missing();
        for (field, raw) in columns.iter().zip(record.iter()) {
            if let Some(field) = field {
                values.set(*field, parse_value(raw)?);
            }
        }
        samples.push(RawSample::new(time, values));
    }

    Ok(samples)
}

fn parse_value(raw: &str) -> Result<Option<f64>, SinkError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == MISSING_VALUE {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| SinkError::InvalidRow(format!("bad value '{}'", raw)))
}

/// Samples at or after `since`, sorted by time
///
/// Files are read newest first until one reaches back to `since`.
pub fn read_since(target: &Path, since: OffsetDateTime) -> Result<Vec<RawSample>, SinkError> {
    let mut samples = Vec::new();

    for (_, path) in daily_log_files(target)?.into_iter().rev() {
        let mut rows = read_file(&path)?;
        let reaches_back = rows.iter().any(|s| s.time <= since);
        samples.append(&mut rows);
        if reaches_back {
            break;
        }
    }

    samples.retain(|s| s.time >= since);
    samples.sort_by_key(|s| s.time);
    Ok(samples)
}
