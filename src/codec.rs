/// Parsing of the station's comma-separated ASCII messages
use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::models::{CanonicalField, Measurements};
use crate::units::{convert, QuantityKind, INVALID_UNIT};

/// Split a line into its message type and the remaining `key=payload` pairs
fn tokenize(line: &str) -> Result<(String, Vec<(&str, &str)>), CodecError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CodecError::EmptyMessage);
    }

    let mut parts = line.split(',');
    let msg_type = parts.next().unwrap_or_default().to_string();

    let mut pairs = Vec::new();
    for token in parts {
        let (key, payload) = token
            .split_once('=')
            .ok_or_else(|| CodecError::MissingSeparator(token.to_string()))?;
        if key.is_empty() {
            return Err(CodecError::EmptyKey(token.to_string()));
        }
        pairs.push((key, payload));
    }

    Ok((msg_type, pairs))
}

/// Parse a data message such as `0R0,Dm=090D,Sm=1.2M,Ta=21.3C`
///
/// The last character of each payload is the unit code. Values are converted
/// to canonical units and keys without a canonical field are dropped.
pub fn parse_message(line: &str) -> Result<(String, Measurements), CodecError> {
    let (msg_type, pairs) = tokenize(line)?;
    let mut values = Measurements::missing();

    for (key, payload) in pairs {
        let field = match CanonicalField::from_device_key(key) {
            Some(field) => field,
            None => continue,
        };

        let unit = payload
            .chars()
            .last()
            .ok_or_else(|| CodecError::EmptyPayload(format!("{}=", key)))?;
        let number = &payload[..payload.len() - unit.len_utf8()];

        let value = if unit == INVALID_UNIT {
            None
        } else {
            let raw: f64 = number.parse().map_err(|_| CodecError::InvalidNumber {
                token: format!("{}={}", key, payload),
                value: number.to_string(),
            })?;
            convert(QuantityKind::from_key(key), unit, raw, None)
        };

        values.set(field, value);
    }

    Ok((msg_type, values))
}

/// Parse a settings reply such as `0WU,R=11111100,I=10,A=3` keeping raw values
pub fn parse_settings(line: &str) -> Result<(String, BTreeMap<String, String>), CodecError> {
    let (msg_type, pairs) = tokenize(line)?;
    let settings = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Ok((msg_type, settings))
}

pub fn format_settings(command: &str, settings: &BTreeMap<String, String>) -> String {
    let mut line = command.to_string();
    for (key, value) in settings {
        line.push(',');
        line.push_str(key);
        line.push('=');
        line.push_str(value);
    }
    line
}

/// A configuration line and the settings it is expected to establish
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettingSpec {
    pub line: String,
    pub command: String,
    pub expected: BTreeMap<String, String>,
}

impl DeviceSettingSpec {
    pub fn parse(line: &str) -> Result<Self, CodecError> {
        let (command, expected) = parse_settings(line)?;
        Ok(Self {
            line: line.trim().to_string(),
            command,
            expected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_message_is_converted_and_mapped() {
        let (msg_type, values) =
            parse_message("0R0,Dn=236D,Dm=283D,Sm=36.0K,Pa=101300P,Ta=23.6C,Vh=12.0N\r\n").unwrap();

        assert_eq!(msg_type, "0R0");
        assert_eq!(values.get(CanonicalField::WindDirMin), Some(236.0));
        assert_eq!(values.get(CanonicalField::WindDirAvg), Some(283.0));
        assert!((values.get(CanonicalField::WindSpeedAvg).unwrap() - 10.0).abs() < 1e-9);
        assert!((values.get(CanonicalField::AirPressure).unwrap() - 1013.0).abs() < 1e-9);
        assert_eq!(values.get(CanonicalField::AirTemperature), Some(23.6));
        assert_eq!(values.get(CanonicalField::RainAccumulation), None);
    }

    #[test]
    fn invalid_unit_marks_reading_missing() {
        let (_, values) = parse_message("0R2,Ta=0.0#,Ua=45.1P").unwrap();
        assert_eq!(values.get(CanonicalField::AirTemperature), None);
        assert_eq!(values.get(CanonicalField::RelHumidity), Some(45.1));
    }

    #[test]
    fn unmapped_keys_are_dropped_whatever_their_payload() {
        let (_, values) = parse_message("0R0,Ta=23.6C,Th=25.9C,Vh=12.0N,Id=HEL___,Xx=").unwrap();
        assert_eq!(values.get(CanonicalField::AirTemperature), Some(23.6));
        assert_eq!(values.get(CanonicalField::HeatingTemperature), Some(25.9));
    }

    #[test]
    fn malformed_tokens_are_errors() {
        assert_eq!(
            parse_message("0R0,Ta23.6C"),
            Err(CodecError::MissingSeparator("Ta23.6C".into()))
        );
        assert_eq!(parse_message("0R0,=1.0M"), Err(CodecError::EmptyKey("=1.0M".into())));
        assert!(matches!(
            parse_message("0R0,Sm=fastM"),
            Err(CodecError::InvalidNumber { .. })
        ));
        assert_eq!(parse_message("  "), Err(CodecError::EmptyMessage));
    }

    #[test]
    fn settings_keep_raw_strings() {
        let (cmd, settings) = parse_settings("0WU,R=01001000,I=10,A=3,U=M").unwrap();
        assert_eq!(cmd, "0WU");
        assert_eq!(settings.get("R").map(String::as_str), Some("01001000"));
        assert_eq!(settings.len(), 4);
        assert_eq!(format_settings(&cmd, &settings), "0WU,A=3,I=10,R=01001000,U=M");
    }

    #[test]
    fn bare_command_has_no_settings() {
        let spec = DeviceSettingSpec::parse("0SU").unwrap();
        assert_eq!(spec.command, "0SU");
        assert!(spec.expected.is_empty());
    }
}
