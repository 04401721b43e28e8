// Unit normalization for station readings. Every reading is converted to a
// canonical metric unit: m/s for speed, hPa for pressure, °C for temperature
// and mm, mm/h or s for precipitation.

/// Unit character the station sends for a reading it could not take
pub const INVALID_UNIT: char = '#';

/// Quantity kind, taken from the first character of a device key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    Speed,
    Pressure,
    Temperature,
    Rain,
}

impl QuantityKind {
    pub fn from_key(key: &str) -> Option<QuantityKind> {
        match key.chars().next()? {
            'S' => Some(QuantityKind::Speed),
            'P' => Some(QuantityKind::Pressure),
            'T' => Some(QuantityKind::Temperature),
            'R' => Some(QuantityKind::Rain),
            _ => None,
        }
    }
}

type Conversion = fn(f64) -> f64;

fn identity(v: f64) -> f64 {
    v
}

const INCH_MM: f64 = 25.4;
const MMHG_HPA: f64 = 1.33322;

static CONVERSIONS: &[(QuantityKind, char, Conversion)] = &[
    (QuantityKind::Speed, 'M', identity),
    (QuantityKind::Speed, 'K', |v| v * 1000.0 / 3600.0),
    (QuantityKind::Speed, 'S', |v| v * 0.44704),
    (QuantityKind::Speed, 'N', |v| v * 0.514444),
    (QuantityKind::Pressure, 'H', identity),
    (QuantityKind::Pressure, 'P', |v| v / 100.0),
    (QuantityKind::Pressure, 'B', |v| v * 1000.0),
    (QuantityKind::Pressure, 'M', |v| v * MMHG_HPA),
    (QuantityKind::Pressure, 'I', |v| v * INCH_MM * MMHG_HPA),
    (QuantityKind::Temperature, 'C', identity),
    (QuantityKind::Temperature, 'F', |v| (v - 32.0) * 5.0 / 9.0),
    (QuantityKind::Rain, 'M', identity),
    (QuantityKind::Rain, 's', identity),
    (QuantityKind::Rain, 'I', |v| v * INCH_MM),
];

fn lookup(kind: QuantityKind, unit: char) -> Conversion {
    CONVERSIONS
        .iter()
        .find(|(k, u, _)| *k == kind && *u == unit)
        .map(|(_, _, f)| *f)
        .unwrap_or(identity)
}

/// Convert a raw reading to its canonical unit
///
/// Unknown kind/unit pairs pass the value through unchanged. The reserved
/// [`INVALID_UNIT`] yields `default` whatever the payload.
pub fn convert(
    kind: Option<QuantityKind>,
    unit: char,
    raw: f64,
    default: Option<f64>,
) -> Option<f64> {
    if unit == INVALID_UNIT {
        return default;
    }
    match kind {
        Some(kind) => Some(lookup(kind, unit)(raw)),
        None => Some(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value expected");
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn speed_in_kmh_becomes_metres_per_second() {
        assert_close(convert(Some(QuantityKind::Speed), 'K', 36.0, None), 10.0);
        assert_close(convert(Some(QuantityKind::Speed), 'M', 4.2, None), 4.2);
    }

    #[test]
    fn pressure_in_pascal_becomes_hectopascal() {
        assert_close(convert(Some(QuantityKind::Pressure), 'P', 101300.0, None), 1013.0);
        assert_close(convert(Some(QuantityKind::Pressure), 'B', 1.013, None), 1013.0);
    }

    #[test]
    fn fahrenheit_becomes_celsius() {
        assert_close(convert(Some(QuantityKind::Temperature), 'F', 212.0, None), 100.0);
    }

    #[test]
    fn unknown_pairs_are_identity() {
        assert_close(convert(Some(QuantityKind::Temperature), 'X', 7.5, None), 7.5);
        assert_close(convert(None, 'D', 270.0, None), 270.0);
    }

    #[test]
    fn invalid_unit_returns_default() {
        assert_eq!(convert(Some(QuantityKind::Rain), INVALID_UNIT, 12.0, None), None);
        assert_eq!(convert(Some(QuantityKind::Rain), INVALID_UNIT, 12.0, Some(-1.0)), Some(-1.0));
    }

    #[test]
    fn kind_comes_from_first_key_character() {
        assert_eq!(QuantityKind::from_key("Sm"), Some(QuantityKind::Speed));
        assert_eq!(QuantityKind::from_key("Rc"), Some(QuantityKind::Rain));
        assert_eq!(QuantityKind::from_key("Dm"), None);
        assert_eq!(QuantityKind::from_key(""), None);
    }
}
