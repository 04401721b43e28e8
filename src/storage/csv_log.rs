/// Daily CSV log files, one row per sample
use async_trait::async_trait;
use log::info;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::Date;
use tokio::task;

use crate::error::SinkError;
use crate::models::{CanonicalField, RawSample};
use crate::storage::SampleSink;

pub const TIME_COLUMN: &str = "time";
pub const MISSING_VALUE: &str = "NaN";
const FILE_PREFIX: &str = "meteo_";
const FILE_SUFFIX: &str = ".csv";

/// `meteo_YYYY-MM-DD.csv`
pub fn file_name(date: Date) -> String {
    format!("{}{}{}", FILE_PREFIX, date, FILE_SUFFIX)
}

/// Date encoded in a daily log file name, if it is one
pub fn file_date(name: &str) -> Option<Date> {
    let stamp = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    Date::parse(stamp, format_description!("[year]-[month]-[day]")).ok()
}

/// Location of the log for `date` below `target`
pub fn file_path(target: &Path, date: Date) -> PathBuf {
    target.join(date.year().to_string()).join(file_name(date))
}

pub fn header() -> Vec<&'static str> {
    std::iter::once(TIME_COLUMN)
        .chain(CanonicalField::ALL.iter().map(|f| f.name()))
        .collect()
}

fn row(sample: &RawSample) -> Result<Vec<String>, SinkError> {
    let time = sample
        .time
        .format(&Rfc3339)
        .map_err(|e| SinkError::InvalidRow(e.to_string()))?;
    let mut row = vec![time];
    row.extend(sample.values.iter().map(|(_, v)| match v {
        Some(v) => v.to_string(),
        None => MISSING_VALUE.to_string(),
    }));
    Ok(row)
}

/// Appends samples to `<target>/<year>/meteo_<date>.csv`
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    target: PathBuf,
}

impl CsvFileSink {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn append(&self, sample: &RawSample) -> Result<PathBuf, SinkError> {
        let path = file_path(&self.target, sample.time.date());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let new_file = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if new_file {
            info!("Created new file {}", path.display());
            writer.write_record(header())?;
        }
        writer.write_record(row(sample)?)?;
        writer.flush()?;

        Ok(path)
    }
}

#[async_trait]
impl SampleSink for CsvFileSink {
    fn name(&self) -> &str {
        "csv"
    }

    /// File I/O runs on the blocking pool so the caller's timeout can fire
    async fn record(&mut self, sample: &RawSample) -> Result<(), SinkError> {
        let sink = self.clone();
        let sample = sample.clone();
        task::spawn_blocking(move || sink.append(&sample)).await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measurements;
    use tempfile::tempdir;
    use time::macros::{date, datetime};

    #[test]
    fn file_names_round_trip_dates() {
        assert_eq!(file_name(date!(2024 - 03 - 07)), "meteo_2024-03-07.csv");
        assert_eq!(file_date("meteo_2024-03-07.csv"), Some(date!(2024 - 03 - 07)));
        assert_eq!(file_date("meteo_2024-3-7.csv"), None);
        assert_eq!(file_date("notes.csv"), None);
    }

    #[tokio::test]
    async fn header_written_once_and_missing_as_nan() {
        let dir = tempdir().unwrap();
        let mut sink = CsvFileSink::new(dir.path());
        let values = Measurements::missing().with(CanonicalField::AirTemperature, 21.5);

        sink.record(&RawSample::new(datetime!(2024-05-01 10:00 UTC), values)).await.unwrap();
        sink.record(&RawSample::new(datetime!(2024-05-01 10:01 UTC), values)).await.unwrap();

        let path = dir.path().join("2024").join("meteo_2024-05-01.csv");
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time,air_temperature,rel_humidity,"));
        assert!(lines[1].starts_with("2024-05-01T10:00:00Z,21.5,NaN,"));
        assert_eq!(lines[1].split(',').count(), 15);
    }

    #[tokio::test]
    async fn record_reports_io_errors_from_the_blocking_pool() {
        let dir = tempdir().unwrap();
        let blocked = dir.path().join("not-a-directory");
        fs::write(&blocked, "").unwrap();
        let mut sink = CsvFileSink::new(&blocked);

        let result = sink
            .record(&RawSample::new(datetime!(2024-05-01 10:00 UTC), Measurements::missing()))
            .await;

        assert!(matches!(result, Err(SinkError::Io(_))));
    }

    #[test]
    fn samples_from_different_days_go_to_different_files() {
        let dir = tempdir().unwrap();
        let sink = CsvFileSink::new(dir.path());

        let a = sink
            .append(&RawSample::new(datetime!(2023-12-31 23:59 UTC), Measurements::missing()))
            .unwrap();
        let b = sink
            .append(&RawSample::new(datetime!(2024-01-01 00:00 UTC), Measurements::missing()))
            .unwrap();

        assert!(a.ends_with("2023/meteo_2023-12-31.csv"));
        assert!(b.ends_with("2024/meteo_2024-01-01.csv"));
    }
}
