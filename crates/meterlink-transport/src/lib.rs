pub mod client;
pub mod error;

pub use client::{HttpIngestClient, IngestTransport};
pub use error::TransportError;
