/// Epoch-aligned fixed-width bucketing of sample series
use time::{Duration, OffsetDateTime};

use crate::aggregate::reduce;
use crate::error::ResampleError;
use crate::models::{RawSample, ResampledSeries};

/// Start of the bucket of width `width_ns` holding `ts_ns`
fn bucket_floor(ts_ns: i128, width_ns: i128) -> i128 {
    ts_ns.div_euclid(width_ns) * width_ns
}

fn width_nanos(width: Duration) -> Result<i128, ResampleError> {
    let width_ns = width.whole_nanoseconds();
    if width_ns <= 0 {
        return Err(ResampleError::InvalidWidth(width));
    }
    Ok(width_ns)
}

fn from_nanos(ts_ns: i128) -> OffsetDateTime {
    // Bucket starts lie between two valid sample timestamps
    OffsetDateTime::from_unix_timestamp_nanos(ts_ns).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Resample over the buckets spanned by the samples themselves
pub fn resample(
    samples: &[RawSample],
    width: Duration,
    include_min_max: bool,
) -> Result<ResampledSeries, ResampleError> {
    let width_ns = width_nanos(width)?;
    let (first, last) = match (
        samples.iter().map(|s| s.time).min(),
        samples.iter().map(|s| s.time).max(),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(Vec::new()),
    };

    // Exclusive end just past the last sample's bucket
    let end = bucket_floor(last.unix_timestamp_nanos(), width_ns) + width_ns;
    resample_range(samples, first, from_nanos(end), width, include_min_max)
}

/// Resample every bucket intersecting `[start, end)`
///
/// Buckets are aligned to the Unix epoch so overlapping queries agree on
/// their boundaries. Buckets without samples carry an all-missing record.
pub fn resample_range(
    samples: &[RawSample],
    start: OffsetDateTime,
    end: OffsetDateTime,
    width: Duration,
    include_min_max: bool,
) -> Result<ResampledSeries, ResampleError> {
    let width_ns = width_nanos(width)?;
    let start_ns = start.unix_timestamp_nanos();
    let end_ns = end.unix_timestamp_nanos();
    if end_ns <= start_ns {
        return Ok(Vec::new());
    }

    let mut ordered: Vec<RawSample> = samples.to_vec();
    ordered.sort_by_key(|s| s.time);

    let mut series = Vec::new();
    let mut bucket = bucket_floor(start_ns, width_ns);
    while bucket < end_ns {
        let next = bucket + width_ns;
        let lo = ordered.partition_point(|s| s.time.unix_timestamp_nanos() < bucket);
        let hi = ordered.partition_point(|s| s.time.unix_timestamp_nanos() < next);
        series.push((from_nanos(bucket), reduce(&ordered[lo..hi], include_min_max)));
        bucket = next;
    }

    Ok(series)
}
