/// Latest-reading and windowed summaries over stored samples
use log::info;
use time::OffsetDateTime;
use tokio::time::Duration;

use crate::aggregate::reduce;
use crate::models::{AggregatedRecord, RawSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// The most recent sample on its own
    LastRow,
    /// Reduction of every sample within the span
    Average,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub time: OffsetDateTime,
    pub span: Duration,
    pub kind: SummaryKind,
    pub record: AggregatedRecord,
}

/// Summarize the last `span` before `now`
///
/// Spans no longer than the polling `interval` report the latest sample;
/// longer spans reduce every sample in `[now - span, now]`.
pub fn latest(
    samples: &[RawSample],
    now: OffsetDateTime,
    span: Duration,
    interval: Duration,
    include_min_max: bool,
) -> Option<Summary> {
    if span > interval {
        let first = now - span;
        let window: Vec<RawSample> = samples
            .iter()
            .filter(|s| s.time >= first && s.time <= now)
            .cloned()
            .collect();
        return Some(Summary {
            time: now,
            span,
            kind: SummaryKind::Average,
            record: reduce(&window, include_min_max),
        });
    }

    let last = samples.iter().max_by_key(|s| s.time)?;
    Some(Summary {
        time: last.time,
        span: interval,
        kind: SummaryKind::LastRow,
        record: reduce(std::slice::from_ref(last), false),
    })
}

/// Write a record to the log, one line per available field
pub fn log_record(label: &str, record: &AggregatedRecord) {
    info!("Summary for {}:", label);
    for (field, value) in record.summary.iter() {
        if let Some(value) = value {
            let range = record
                .minimum
                .and_then(|m| m.get(field))
                .zip(record.maximum.and_then(|m| m.get(field)));
            match range {
                Some((lo, hi)) => info!(
                    "  {}: {:.2} {} ({:.2} .. {:.2})",
                    field,
                    value,
                    field.unit(),
                    lo,
                    hi
                ),
                None => info!("  {}: {:.2} {}", field, value, field.unit()),
            }
        }
    }
    info!("  Based on {} samples", record.samples);
}
