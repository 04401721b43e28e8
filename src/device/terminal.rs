/// Request/response exchange with the weather station
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::time::Duration;

use crate::codec::{parse_settings, DeviceSettingSpec};
use crate::device::transport::{SerialTransport, Transport};
use crate::error::DeviceError;

// Station command set (address 0)
pub const POLL_COMMAND: &str = "0R0";
pub const PROBE_COMMAND: &str = "?";
pub const IDENTIFY_COMMAND: &str = "0";
pub const IDENTIFY_REPLY: &str = "0";
pub const RESET_RAIN_COUNTER: &str = "0XZRU";
pub const RESET_RAIN_INTENSITY: &str = "0XZRI";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    Idle,
    AwaitingResponse,
}

/// Half-duplex terminal on top of a line transport
pub struct MeteoTerminal<T: Transport> {
    transport: T,
    state: TerminalState,
}

impl<T: Transport> MeteoTerminal<T> {
    /// Wrap a transport and discard whatever the station sent before we arrived
    pub async fn open(transport: T) -> Result<Self, DeviceError> {
        let mut terminal = Self {
            transport,
            state: TerminalState::Idle,
        };
        terminal.clear(false).await?;
        Ok(terminal)
    }

    pub fn name(&self) -> &str {
        self.transport.name()
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn send(&mut self, command: &str) -> Result<(), DeviceError> {
        debug!("-> {}", command);
        self.transport.write_line(command).await?;
        self.state = TerminalState::AwaitingResponse;
        Ok(())
    }

    /// Read one reply line; a silent station yields an empty string
    pub async fn receive(&mut self) -> Result<String, DeviceError> {
        let line = self.transport.read_line().await?;
        self.state = TerminalState::Idle;
        let line = line.map(|l| l.trim().to_string()).unwrap_or_default();
        if !line.is_empty() {
            debug!("<- {}", line);
        }
        Ok(line)
    }

    pub async fn ask(&mut self, command: &str) -> Result<String, DeviceError> {
        self.send(command).await?;
        self.receive().await
    }

    /// Drain stray input, then probe once so the link is known to be quiet
    pub async fn clear(&mut self, loud: bool) -> Result<(), DeviceError> {
        loop {
            let line = self.receive().await?;
            if line.is_empty() {
                break;
            }
            if loud {
                warn!("Unexpected response: {}", line);
            }
        }
        self.ask(PROBE_COMMAND).await?;
        Ok(())
    }

    /// Bring the station configuration in line with `settings`
    ///
    /// Each setting is queried first and only written when the reported
    /// values differ. Returns the number of set commands issued.
    pub async fn setup(&mut self, settings: &[DeviceSettingSpec]) -> Result<usize, DeviceError> {
        let mut writes = 0;

        for setting in settings {
            let reply = self.ask(&setting.command).await?;
            let current = if reply.is_empty() {
                BTreeMap::new()
            } else {
                match parse_settings(&reply) {
                    Ok((_, current)) => current,
                    Err(e) => {
                        warn!("Unreadable reply to {}: {} ({})", setting.command, reply, e);
                        BTreeMap::new()
                    }
                }
            };

            let current: BTreeMap<String, String> = current
                .into_iter()
                .filter(|(k, _)| setting.expected.contains_key(k))
                .collect();

            if current == setting.expected {
                info!("Setup \"{}\" already ok.", setting.line);
                continue;
            }

            let answer = self.ask(&setting.line).await?;
            writes += 1;
            info!("Setup \"{}\", answer \"{}\".", setting.line, answer);
            self.clear(true).await?;
        }

        Ok(writes)
    }

    /// Release the device connection
    pub fn close(self) -> T {
        info!("Closing connection to {}", self.transport.name());
        self.transport
    }
}

impl MeteoTerminal<SerialTransport> {
    pub async fn open_serial(
        port: &str,
        baudrate: u32,
        read_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let transport = SerialTransport::open(port, baudrate, read_timeout)?;
        Self::open(transport).await
    }

    /// Probe every serial port on the machine for a station
    pub async fn find_serial_station(baudrate: u32, read_timeout: Duration) -> Option<String> {
        let ports = match SerialTransport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Failed to list serial ports: {}", e);
                return None;
            }
        };
        find_station(ports, |name| async move {
            SerialTransport::open(&name, baudrate, read_timeout)
        })
        .await
    }
}

/// Return the first endpoint whose device answers the identification probe
///
/// Endpoints that cannot be opened or do not answer are skipped.
pub async fn find_station<T, F, Fut>(candidates: Vec<String>, mut open: F) -> Option<String>
where
    T: Transport,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, DeviceError>>,
{
    let mut found = None;

    for name in candidates {
        debug!("Try {}", name);
        let transport = match open(name.clone()).await {
            Ok(transport) => transport,
            Err(e) => {
                debug!("Skipping {}: {}", name, e);
                continue;
            }
        };

        let answer = match MeteoTerminal::open(transport).await {
            Ok(mut terminal) => terminal.ask(IDENTIFY_COMMAND).await,
            Err(e) => Err(e),
        };

        match answer {
            Ok(answer) if answer == IDENTIFY_REPLY => {
                debug!("OK: {}", name);
                found = Some(name);
                break;
            }
            Ok(answer) => debug!("{} answered {:?}", name, answer),
            Err(e) => debug!("Skipping {}: {}", name, e),
        }
    }

    info!("Found meteo station: {:?}", found);
    found
}
