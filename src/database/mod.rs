pub mod connection;
pub mod operations;

pub use connection::create_ssl_connector;
pub use operations::{create_table, store_sample, PostgresSink};
