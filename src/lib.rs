// Weather station logger: polls a WXT-style station over a serial line,
// stores every sample in daily CSV logs (and optionally PostgreSQL), and
// reduces stored samples into windowed summaries.

pub mod acquisition;
pub mod aggregate;
pub mod codec;
pub mod config;
pub mod database;
pub mod device;
pub mod error;
pub mod models;
pub mod resample;
pub mod storage;
pub mod summary;
pub mod units;
pub mod utils;
