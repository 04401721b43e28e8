/// Reduction of a window of samples into one summary record
///
/// Scalars are averaged, accumulating counters keep their largest value and
/// wind direction is handled on the circle:
/// - `wind_dir_avg` is the circular mean of the per-sample averages
/// - `wind_dir_min` / `wind_dir_max` are taken from the sample that reported
///   the window's lowest / highest wind speed
use crate::models::{AggregatedRecord, CanonicalField, Measurements, RawSample};

/// A resultant shorter than this (per sample) leaves the mean direction undefined
const DEGENERATE_RESULTANT: f64 = 1e-9;

enum Reduction {
    Mean,
    Min,
    Max,
    CircularMean,
    DirectionAtMinimum(CanonicalField),
    DirectionAtMaximum(CanonicalField),
}

fn reduction(field: CanonicalField) -> Reduction {
    match field {
        CanonicalField::AirTemperature
        | CanonicalField::RelHumidity
        | CanonicalField::AirPressure
        | CanonicalField::WindSpeedAvg
        | CanonicalField::RainIntensity
        | CanonicalField::HeatingTemperature => Reduction::Mean,
        CanonicalField::WindSpeedMin => Reduction::Min,
        CanonicalField::WindSpeedMax
        | CanonicalField::RainAccumulation
        | CanonicalField::RainDuration
        | CanonicalField::RainPeakIntensity => Reduction::Max,
        CanonicalField::WindDirAvg => Reduction::CircularMean,
        CanonicalField::WindDirMin => Reduction::DirectionAtMinimum(CanonicalField::WindSpeedMin),
        CanonicalField::WindDirMax => Reduction::DirectionAtMaximum(CanonicalField::WindSpeedMax),
    }
}

/// Reduce `samples` to one record
///
/// Missing values are ignored. An empty slice gives a record with every field
/// missing. With `include_min_max` the record also carries the scalar minimum
/// and maximum of every non-directional field.
pub fn reduce(samples: &[RawSample], include_min_max: bool) -> AggregatedRecord {
    if samples.is_empty() {
        return AggregatedRecord::empty(include_min_max);
    }

    // Stable sort keeps input order among equal timestamps
    let mut ordered: Vec<&RawSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.time);

    let mut summary = Measurements::missing();
    for field in CanonicalField::ALL {
        let value = match reduction(field) {
            Reduction::Mean => mean(present(&ordered, field)),
            Reduction::Min => present(&ordered, field).reduce(f64::min),
            Reduction::Max => present(&ordered, field).reduce(f64::max),
            Reduction::CircularMean => circular_mean(present(&ordered, field)),
            Reduction::DirectionAtMinimum(speed) => {
                extremal_index(&ordered, speed, |candidate, best| candidate < best)
                    .and_then(|i| ordered[i].get(field))
            }
            Reduction::DirectionAtMaximum(speed) => {
                extremal_index(&ordered, speed, |candidate, best| candidate > best)
                    .and_then(|i| ordered[i].get(field))
            }
        };
        summary.set(field, value);
    }

    let (minimum, maximum) = if include_min_max {
        let (min, max) = extrema(&ordered);
        (Some(min), Some(max))
    } else {
        (None, None)
    };

    AggregatedRecord {
        summary,
        minimum,
        maximum,
        samples: samples.len(),
    }
}

fn present<'a>(
    samples: &'a [&'a RawSample],
    field: CanonicalField,
) -> impl Iterator<Item = f64> + 'a {
    samples.iter().filter_map(move |s| s.get(field))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean direction in degrees within [0, 360)
///
/// Returns `None` when there are no values or the unit vectors cancel out,
/// e.g. for readings spread evenly around the circle.
pub fn circular_mean(degrees: impl Iterator<Item = f64>) -> Option<f64> {
    let (sin_sum, cos_sum, count) = degrees.fold((0.0_f64, 0.0_f64, 0usize), |(s, c, n), d| {
        let rad = d.to_radians();
        (s + rad.sin(), c + rad.cos(), n + 1)
    });

    if count == 0 || sin_sum.hypot(cos_sum) < DEGENERATE_RESULTANT * count as f64 {
        return None;
    }

    let deg = sin_sum.atan2(cos_sum).to_degrees().rem_euclid(360.0);
    Some(if deg >= 360.0 { 0.0 } else { deg })
}

/// Index of the first sample whose `speed` beats every earlier one
fn extremal_index(
    samples: &[&RawSample],
    speed: CanonicalField,
    better: impl Fn(f64, f64) -> bool,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, sample) in samples.iter().enumerate() {
        if let Some(value) = sample.get(speed) {
            match best {
                Some((_, current)) if !better(value, current) => {}
                _ => best = Some((i, value)),
            }
        }
    }
    best.map(|(i, _)| i)
}

fn extrema(samples: &[&RawSample]) -> (Measurements, Measurements) {
    let mut min = Measurements::missing();
    let mut max = Measurements::missing();
    for field in CanonicalField::ALL.into_iter().filter(|f| !f.is_direction()) {
        min.set(field, present(samples, field).reduce(f64::min));
        max.set(field, present(samples, field).reduce(f64::max));
    }
    (min, max)
}
