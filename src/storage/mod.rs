pub mod csv_log;
pub mod history;
pub mod retention;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::models::RawSample;

pub use csv_log::CsvFileSink;
pub use history::read_since;
pub use retention::delete_oldest_files;

/// Destination that records every polled sample
#[async_trait]
pub trait SampleSink: Send {
    fn name(&self) -> &str;

    async fn record(&mut self, sample: &RawSample) -> Result<(), SinkError>;
}
