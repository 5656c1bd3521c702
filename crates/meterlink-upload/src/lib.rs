//! `meterlink-upload` — the batch upload pass.
//!
//! One [`task::UploadTask`] run pulls every channel's records from the
//! configured lookback window, packs them into batches of at most 5000
//! readings, transmits each full batch the moment it fills up and the
//! remainder at the end, and reports the run's health to an optional status
//! channel.

pub mod task;

pub use task::UploadTask;
