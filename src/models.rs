/// Measurement data model shared by the device codec, sinks and aggregation
use std::fmt;
use time::OffsetDateTime;

/// Number of canonical fields understood by the logger
pub const FIELD_COUNT: usize = 14;

/// A unit-normalized quantity reported by the weather station
///
/// The declaration order is the persisted column order of the daily CSV logs
/// and the database table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    AirTemperature,
    RelHumidity,
    AirPressure,
    WindSpeedAvg,
    WindSpeedMin,
    WindSpeedMax,
    WindDirAvg,
    WindDirMin,
    WindDirMax,
    RainAccumulation,
    RainDuration,
    RainIntensity,
    RainPeakIntensity,
    HeatingTemperature,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; FIELD_COUNT] = [
        CanonicalField::AirTemperature,
        CanonicalField::RelHumidity,
        CanonicalField::AirPressure,
        CanonicalField::WindSpeedAvg,
        CanonicalField::WindSpeedMin,
        CanonicalField::WindSpeedMax,
        CanonicalField::WindDirAvg,
        CanonicalField::WindDirMin,
        CanonicalField::WindDirMax,
        CanonicalField::RainAccumulation,
        CanonicalField::RainDuration,
        CanonicalField::RainIntensity,
        CanonicalField::RainPeakIntensity,
        CanonicalField::HeatingTemperature,
    ];

    /// Column name used in logs and the database
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::AirTemperature => "air_temperature",
            CanonicalField::RelHumidity => "rel_humidity",
            CanonicalField::AirPressure => "air_pressure",
            CanonicalField::WindSpeedAvg => "wind_speed_avg",
            CanonicalField::WindSpeedMin => "wind_speed_min",
            CanonicalField::WindSpeedMax => "wind_speed_max",
            CanonicalField::WindDirAvg => "wind_dir_avg",
            CanonicalField::WindDirMin => "wind_dir_min",
            CanonicalField::WindDirMax => "wind_dir_max",
            CanonicalField::RainAccumulation => "rain_accumulation",
            CanonicalField::RainDuration => "rain_duration",
            CanonicalField::RainIntensity => "rain_intensity",
            CanonicalField::RainPeakIntensity => "rain_peak_intensity",
            CanonicalField::HeatingTemperature => "heating_temperature",
        }
    }

    /// Two-letter key the station uses in composite data messages
    pub fn device_key(self) -> &'static str {
        match self {
            CanonicalField::AirTemperature => "Ta",
            CanonicalField::RelHumidity => "Ua",
            CanonicalField::AirPressure => "Pa",
            CanonicalField::WindSpeedAvg => "Sm",
            CanonicalField::WindSpeedMin => "Sn",
            CanonicalField::WindSpeedMax => "Sx",
            CanonicalField::WindDirAvg => "Dm",
            CanonicalField::WindDirMin => "Dn",
            CanonicalField::WindDirMax => "Dx",
            CanonicalField::RainAccumulation => "Rc",
            CanonicalField::RainDuration => "Rd",
            CanonicalField::RainIntensity => "Ri",
            CanonicalField::RainPeakIntensity => "Rp",
            CanonicalField::HeatingTemperature => "Th",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            CanonicalField::AirTemperature | CanonicalField::HeatingTemperature => "°C",
            CanonicalField::RelHumidity => "%",
            CanonicalField::AirPressure => "hPa",
            CanonicalField::WindSpeedAvg
            | CanonicalField::WindSpeedMin
            | CanonicalField::WindSpeedMax => "m/s",
            CanonicalField::WindDirAvg
            | CanonicalField::WindDirMin
            | CanonicalField::WindDirMax => "deg",
            CanonicalField::RainAccumulation => "mm",
            CanonicalField::RainDuration => "s",
            CanonicalField::RainIntensity | CanonicalField::RainPeakIntensity => "mm/h",
        }
    }

    /// Reverse lookup from a device key; unknown keys have no canonical field
    pub fn from_device_key(key: &str) -> Option<CanonicalField> {
        Self::ALL.iter().copied().find(|f| f.device_key() == key)
    }

    pub fn from_name(name: &str) -> Option<CanonicalField> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn is_direction(self) -> bool {
        matches!(
            self,
            CanonicalField::WindDirAvg | CanonicalField::WindDirMin | CanonicalField::WindDirMax
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value slot per canonical field; `None` marks a missing reading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurements {
    values: [Option<f64>; FIELD_COUNT],
}

impl Measurements {
    /// Every field missing
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn get(&self, field: CanonicalField) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: CanonicalField, value: Option<f64>) {
        self.values[field.index()] = value;
    }

    pub fn with(mut self, field: CanonicalField, value: f64) -> Self {
        self.set(field, Some(value));
        self
    }

    /// Fields in persisted order together with their values
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<f64>)> + '_ {
        CanonicalField::ALL.iter().map(|f| (*f, self.get(*f)))
    }

    pub fn is_all_missing(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// A single poll result from the station
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub time: OffsetDateTime,
    pub values: Measurements,
}

impl RawSample {
    pub fn new(time: OffsetDateTime, values: Measurements) -> Self {
        Self { time, values }
    }

    pub fn get(&self, field: CanonicalField) -> Option<f64> {
        self.values.get(field)
    }
}

/// Reduction of a window of samples
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    pub summary: Measurements,
    pub minimum: Option<Measurements>,
    pub maximum: Option<Measurements>,
    pub samples: usize,
}

impl AggregatedRecord {
    /// Record for a window without any samples
    pub fn empty(include_min_max: bool) -> Self {
        let extrema = include_min_max.then(Measurements::missing);
        Self {
            summary: Measurements::missing(),
            minimum: extrema,
            maximum: extrema,
            samples: 0,
        }
    }

    pub fn get(&self, field: CanonicalField) -> Option<f64> {
        self.summary.get(field)
    }
}

/// Bucket start paired with the reduction of the samples it contains
pub type ResampledSeries = Vec<(OffsetDateTime, AggregatedRecord)>;
