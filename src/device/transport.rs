/// Line-oriented transports for talking to the station
use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use futures_util::{SinkExt, StreamExt};
use log::debug;
use std::io;
use tokio::time::{timeout, Duration};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};

use crate::error::DeviceError;

// Serial defaults of the WXT family
pub const DEFAULT_BAUDRATE: u32 = 19200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_LINE_LENGTH: usize = 1024;

/// Capability to exchange text lines with a device
///
/// `read_line` waits at most the transport's read timeout and returns
/// `Ok(None)` when nothing arrived in time.
#[async_trait]
pub trait Transport: Send {
    fn name(&self) -> &str;

    async fn write_line(&mut self, line: &str) -> Result<(), DeviceError>;

    async fn read_line(&mut self) -> Result<Option<String>, DeviceError>;
}

/// Newline-delimited decoding with CRLF-terminated encoding
#[derive(Debug)]
pub struct CrlfLinesCodec {
    inner: LinesCodec,
}

impl CrlfLinesCodec {
    pub fn new() -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for CrlfLinesCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CrlfLinesCodec {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        self.inner.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, LinesCodecError> {
        self.inner.decode_eof(src)
    }
}

impl Encoder<String> for CrlfLinesCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), LinesCodecError> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

impl From<LinesCodecError> for DeviceError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::Io(e) => DeviceError::Io(e),
            other => DeviceError::Lines(other.to_string()),
        }
    }
}

/// Serial port transport
pub struct SerialTransport {
    port: String,
    framed: Framed<SerialStream, CrlfLinesCodec>,
    read_timeout: Duration,
}

impl SerialTransport {
    pub fn open(port: &str, baudrate: u32, read_timeout: Duration) -> Result<Self, DeviceError> {
        debug!("Opening serial port {} @ {}", port, baudrate);
        let stream = tokio_serial::new(port, baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(read_timeout)
            .open_native_async()?;

        Ok(Self {
            port: port.to_string(),
            framed: Framed::new(stream, CrlfLinesCodec::new()),
            read_timeout,
        })
    }

    /// Names of the serial ports present on this machine
    pub fn available_ports() -> Result<Vec<String>, DeviceError> {
        Ok(tokio_serial::available_ports()?
            .into_iter()
            .map(|p| p.port_name)
            .collect())
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.port
    }

    async fn write_line(&mut self, line: &str) -> Result<(), DeviceError> {
        // SinkExt::send flushes the port
        self.framed.send(line.to_string()).await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, DeviceError> {
        match timeout(self.read_timeout, self.framed.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(DeviceError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("serial port {} closed", self.port),
            ))),
            Ok(Some(line)) => Ok(Some(line?)),
        }
    }
}
