//! `meterlink-scheduler` — phase-aligned periodic triggering of the upload
//! task.
//!
//! # Overview
//!
//! The first trigger is aligned to a configured anchor instant so that runs
//! land on predictable wall-clock boundaries (anchor midnight + an interval
//! that divides 24h puts every run on the hour). The armed timer never
//! invokes the upload logic directly: each tick fires a [`engine::Trigger`]
//! feeding a dedicated worker, and the trigger stays busy until the run
//! completes, so a tick landing mid-run is skipped rather than overlapped
//! or deferred off-phase.

pub mod engine;
pub mod schedule;

pub use engine::{spawn_worker, Trigger, UploadScheduler};
pub use schedule::{compute_next_run, ScheduleSpec};
