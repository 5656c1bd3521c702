pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::MeterlinkConfig;
pub use error::{ConfigError, Result};
pub use types::{MeterReading, ReadingBatch, Record, RunOutcome, MAX_BATCH_READINGS};
