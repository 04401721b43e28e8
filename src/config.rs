use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;

use crate::codec::DeviceSettingSpec;
use crate::device::transport::{DEFAULT_BAUDRATE, DEFAULT_READ_TIMEOUT};
use crate::error::ConfigError;

const DEFAULT_INTERVAL_SECS: u64 = 10;
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TABLE: &str = "meteo";

/// Where to find the station
#[derive(Debug, Clone, PartialEq)]
pub enum PortSelection {
    Auto,
    Path(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeteoConfig {
    pub serial: PortSelection,
    pub baudrate: u32,
    pub read_timeout: Duration,
    pub interval: Duration,
    pub target: PathBuf,
    pub max_files: usize,
    pub setup: Vec<DeviceSettingSpec>,
    pub sink_timeout: Duration,
    pub database: Option<DatabaseConfig>,
}

impl MeteoConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables
        dotenv::dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        info!(
            "Loaded configuration: port {:?}, interval {:?}, target {}, database {}",
            config.serial,
            config.interval,
            config.target.display(),
            if config.database.is_some() { "enabled" } else { "disabled" }
        );
        Ok(config)
    }

    /// Build the configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let serial = match lookup("METEO_SERIAL").map(|s| s.trim().to_string()) {
            None => PortSelection::Auto,
            Some(s) if s.is_empty() || s == "auto" => PortSelection::Auto,
            Some(s) => PortSelection::Path(s),
        };

        let target = lookup("METEO_TARGET")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("METEO_TARGET"))?;

        let max_files: usize = parse(&lookup, "METEO_MAX_FILES")?
            .ok_or(ConfigError::Missing("METEO_MAX_FILES"))?;
        if max_files == 0 {
            return Err(ConfigError::Invalid {
                name: "METEO_MAX_FILES",
                value: "0".into(),
            });
        }

        let interval_secs: u64 =
            parse(&lookup, "METEO_INTERVAL_SECS")?.unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "METEO_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        let mut setup = Vec::new();
        if let Some(lines) = lookup("METEO_SETUP") {
            for line in lines.split(';').map(str::trim).filter(|l| !l.is_empty()) {
                debug!("Setup line: '{}'", line);
                let spec = DeviceSettingSpec::parse(line).map_err(|_| ConfigError::Invalid {
                    name: "METEO_SETUP",
                    value: line.to_string(),
                })?;
                setup.push(spec);
            }
        }

        let database = match lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(url) => {
                let table = lookup("METEO_DB_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
                let valid = !table.is_empty()
                    && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !valid {
                    return Err(ConfigError::Invalid {
                        name: "METEO_DB_TABLE",
                        value: table,
                    });
                }
                Some(DatabaseConfig { url, table })
            }
            None => None,
        };

        Ok(MeteoConfig {
            serial,
            baudrate: parse(&lookup, "METEO_BAUDRATE")?.unwrap_or(DEFAULT_BAUDRATE),
            read_timeout: parse(&lookup, "METEO_READ_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_READ_TIMEOUT),
            interval: Duration::from_secs(interval_secs),
            target,
            max_files,
            setup,
            sink_timeout: Duration::from_secs(
                parse(&lookup, "METEO_SINK_TIMEOUT_SECS")?.unwrap_or(DEFAULT_SINK_TIMEOUT_SECS),
            ),
            database,
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&'static str, &str)]) -> Result<MeteoConfig, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        MeteoConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn minimal_configuration_uses_defaults() {
        let config =
            config(&[("METEO_TARGET", "/var/log/meteo"), ("METEO_MAX_FILES", "30")]).unwrap();

        assert_eq!(config.serial, PortSelection::Auto);
        assert_eq!(config.baudrate, 19200);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.max_files, 30);
        assert!(config.setup.is_empty());
        assert_eq!(config.database, None);
    }

    #[test]
    fn full_configuration() {
        let config = config(&[
            ("METEO_SERIAL", "/dev/ttyUSB0"),
            ("METEO_BAUDRATE", "9600"),
            ("METEO_INTERVAL_SECS", "60"),
            ("METEO_TARGET", "/data"),
            ("METEO_MAX_FILES", "7"),
            ("METEO_SETUP", "0WU,I=10,A=3; 0RU,R=11111111 ;"),
            ("DATABASE_URL", "postgres://localhost/weather"),
        ])
        .unwrap();

        assert_eq!(config.serial, PortSelection::Path("/dev/ttyUSB0".into()));
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.setup.len(), 2);
        assert_eq!(config.setup[1].command, "0RU");
        assert_eq!(config.database.unwrap().table, "meteo");
    }

    #[test]
    fn missing_and_invalid_values_are_rejected() {
        assert_eq!(
            config(&[("METEO_MAX_FILES", "3")]),
            Err(ConfigError::Missing("METEO_TARGET"))
        );
        assert_eq!(
            config(&[("METEO_TARGET", "/data"), ("METEO_MAX_FILES", "many")]),
            Err(ConfigError::Invalid {
                name: "METEO_MAX_FILES",
                value: "many".into()
            })
        );
        assert!(config(&[
            ("METEO_TARGET", "/data"),
            ("METEO_MAX_FILES", "3"),
            ("DATABASE_URL", "postgres://localhost/weather"),
            ("METEO_DB_TABLE", "meteo; DROP TABLE x"),
        ])
        .is_err());
        assert!(config(&[
            ("METEO_TARGET", "/data"),
            ("METEO_MAX_FILES", "3"),
            ("METEO_SETUP", "0WU,I10"),
        ])
        .is_err());
    }
}
