/// Error types for each layer of the logger
use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("token '{0}' has no '=' separator")]
    MissingSeparator(String),
    #[error("token '{0}' has an empty key")]
    EmptyKey(String),
    #[error("token '{0}' has an empty payload")]
    EmptyPayload(String),
    #[error("token '{token}' has a non-numeric value '{value}'")]
    InvalidNumber { token: String, value: String },
    #[error("empty message")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line codec error: {0}")]
    Lines(String),
    #[error("no meteo station found")]
    NotFound,
    #[error("malformed device reply: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("database error: {0}")]
    Database(String),
    #[error("invalid log row: {0}")]
    InvalidRow(String),
    #[error("sink task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ResampleError {
    #[error("bucket width must be positive, got {0}")]
    InvalidWidth(time::Duration),
}

/// Anything that can go wrong inside one acquisition tick
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("no reply to poll command")]
    NoReply,
}
