use log::{error, info};
use tokio_util::sync::CancellationToken;

use meteo_logger::acquisition::AcquisitionLoop;
use meteo_logger::config::{MeteoConfig, PortSelection};
use meteo_logger::database::PostgresSink;
use meteo_logger::device::{MeteoTerminal, SerialTransport};
use meteo_logger::error::DeviceError;
use meteo_logger::storage::{CsvFileSink, SampleSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match MeteoConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Locate the station
    let port = match &config.serial {
        PortSelection::Path(port) => Some(port.clone()),
        PortSelection::Auto => {
            MeteoTerminal::<SerialTransport>::find_serial_station(
                config.baudrate,
                config.read_timeout,
            )
            .await
        }
    };
    let port = match port {
        Some(port) => port,
        None => {
            error!("No meteo station found. Specify the port with METEO_SERIAL.");
            return Err(DeviceError::NotFound.into());
        }
    };

    // Set up sinks
    let mut sinks: Vec<Box<dyn SampleSink>> = vec![Box::new(CsvFileSink::new(&config.target))];
    if let Some(db) = &config.database {
        match PostgresSink::connect(&db.url, &db.table).await {
            Ok(sink) => sinks.push(Box::new(sink)),
            Err(e) => {
                error!("While setting up database: {}", e);
                return Err(e.into());
            }
        }
    }

    let opened =
        MeteoTerminal::<SerialTransport>::open_serial(&port, config.baudrate, config.read_timeout)
            .await;
    let mut terminal = match opened {
        Ok(terminal) => terminal,
        Err(e) => {
            error!("Failed to open meteo station on {}: {}", port, e);
            return Err(e.into());
        }
    };

    if let Err(e) = terminal.setup(&config.setup).await {
        error!("Station setup failed: {}", e);
        return Err(e.into());
    }

    // Handle Ctrl+C gracefully
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => trigger.cancel(),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let acquisition = AcquisitionLoop::new(terminal, sinks, &config);
    drop(acquisition.run(cancel).await);

    info!("Program terminated by user. Exiting gracefully.");
    Ok(())
}
