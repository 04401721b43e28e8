/// Polling loop: one station sample per tick, delivered to every sink
use log::{debug, error, info, warn};
use std::path::PathBuf;
use time::{Date, OffsetDateTime};
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::aggregate::reduce;
use crate::codec::parse_message;
use crate::config::MeteoConfig;
use crate::device::terminal::{POLL_COMMAND, RESET_RAIN_COUNTER, RESET_RAIN_INTENSITY};
use crate::device::{MeteoTerminal, Transport};
use crate::error::TickError;
use crate::models::RawSample;
use crate::storage::{delete_oldest_files, read_since, SampleSink};
use crate::summary::log_record;
use crate::utils::{format_datetime, start_of_day};

/// Intervals up to this length wait for the deadline in fine steps only
pub const COARSE_SLEEP_THRESHOLD: Duration = Duration::from_secs(2);
const COARSE_STEP: Duration = Duration::from_secs(1);
const FINE_WAIT_SLACK: Duration = Duration::from_secs(1);
const FINE_WAIT_STEP: Duration = Duration::from_millis(10);

/// Fires once for every calendar day the loop crosses into
#[derive(Debug, Default)]
pub struct DayRollover {
    last: Option<Date>,
}

impl DayRollover {
    pub fn new() -> Self {
        Self::default()
    }

    /// The day being entered, if the next tick after `now` falls on a new day
    pub fn check(&mut self, now: OffsetDateTime, interval: Duration) -> Option<Date> {
        let next_day = (now + interval).date();
        if next_day > now.date() && self.last != Some(next_day) {
            self.last = Some(next_day);
            Some(next_day)
        } else {
            None
        }
    }
}

/// Block until `deadline`
///
/// Longer intervals sleep in coarse steps until shortly before the deadline.
/// The remainder, or the whole wait for intervals up to
/// [`COARSE_SLEEP_THRESHOLD`], is covered in fine monotonic steps.
pub async fn wait_until(deadline: Instant, interval: Duration) {
    if interval > COARSE_SLEEP_THRESHOLD {
        let coarse_end = deadline.checked_sub(FINE_WAIT_SLACK).unwrap_or(deadline);
        loop {
            let now = Instant::now();
            if now >= coarse_end {
                break;
            }
            sleep(COARSE_STEP.min(coarse_end - now)).await;
        }
    }

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(FINE_WAIT_STEP.min(deadline - now)).await;
    }
}

pub struct AcquisitionLoop<T: Transport> {
    terminal: MeteoTerminal<T>,
    sinks: Vec<Box<dyn SampleSink>>,
    interval: Duration,
    sink_timeout: Duration,
    target: PathBuf,
    max_files: usize,
    rollover: DayRollover,
}

impl<T: Transport> AcquisitionLoop<T> {
    pub fn new(
        terminal: MeteoTerminal<T>,
        sinks: Vec<Box<dyn SampleSink>>,
        config: &MeteoConfig,
    ) -> Self {
        Self {
            terminal,
            sinks,
            interval: config.interval,
            sink_timeout: config.sink_timeout,
            target: config.target.clone(),
            max_files: config.max_files,
            rollover: DayRollover::new(),
        }
    }

    /// Run until `cancel` fires, then release the station
    pub async fn run(mut self, cancel: CancellationToken) -> T {
        info!("Will now take action every {:?}.", self.interval);

        while !cancel.is_cancelled() {
            let started = Instant::now();
            let now = OffsetDateTime::now_utc();
            debug!("Tick at {}", format_datetime(&now));

            if let Err(e) = self.tick(now).await {
                warn!("Exception in main loop: {}", e);
            }

            let deadline = started + self.interval;
            if Instant::now() >= deadline {
                warn!("Loop took longer than interval. Working as fast as possible.");
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = wait_until(deadline, self.interval) => {}
            }
        }

        info!("Terminated by user.");
        self.terminal.close()
    }

    /// Poll, deliver and do day-end housekeeping for a tick starting at `now`
    pub async fn tick(&mut self, now: OffsetDateTime) -> Result<RawSample, TickError> {
        let polled = self.poll(now).await;
        if let Ok(sample) = &polled {
            self.deliver(sample).await;
        }

        if let Some(day) = self.rollover.check(now, self.interval) {
            self.roll_over(now, day).await?;
        }

        polled
    }

    async fn poll(&mut self, now: OffsetDateTime) -> Result<RawSample, TickError> {
        let reply = self.terminal.ask(POLL_COMMAND).await?;
        if reply.is_empty() {
            return Err(TickError::NoReply);
        }
        let (_, values) = parse_message(&reply)?;
        Ok(RawSample::new(now, values))
    }

    /// Hand the sample to every sink; failures are logged and skipped
    async fn deliver(&mut self, sample: &RawSample) {
        for sink in self.sinks.iter_mut() {
            let name = sink.name().to_string();
            match timeout(self.sink_timeout, sink.record(sample)).await {
                Ok(Ok(())) => debug!("Stored sample in {} sink", name),
                Ok(Err(e)) => error!("Failed to store sample in {} sink: {}", name, e),
                Err(_) => error!(
                    "{} sink did not respond within {:?}, sample skipped",
                    name, self.sink_timeout
                ),
            }
        }
    }

    async fn roll_over(&mut self, now: OffsetDateTime, day: Date) -> Result<(), TickError> {
        info!("Reset precipitation counters before {}.", day);
        self.terminal.ask(RESET_RAIN_COUNTER).await?;
        self.terminal.ask(RESET_RAIN_INTENSITY).await?;

        match delete_oldest_files(&self.target, self.max_files) {
            Ok(removed) => {
                for path in removed {
                    info!("Deleted {}", path.display());
                }
            }
            Err(e) => warn!("Log housekeeping failed: {}", e),
        }

        match read_since(&self.target, start_of_day(now)) {
            Ok(samples) => log_record(&now.date().to_string(), &reduce(&samples, true)),
            Err(e) => warn!("Could not read back the daily log: {}", e),
        }

        Ok(())
    }
}
