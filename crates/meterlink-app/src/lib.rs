//! `meterlink-app` — component wiring.
//!
//! Hosts hand the component a channel registry at activation and push
//! configuration updates afterwards; each accepted update rebuilds the
//! transport and upload task and atomically re-arms the schedule. The host
//! owns the tracing subscriber and the tokio runtime.

pub mod component;

pub use component::MeterlinkApp;
