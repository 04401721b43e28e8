pub mod terminal;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use terminal::{find_station, MeteoTerminal, TerminalState};
pub use transport::{SerialTransport, Transport};
