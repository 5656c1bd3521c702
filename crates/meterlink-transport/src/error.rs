use thiserror::Error;

/// Errors raised while transmitting a batch to the ingestion endpoint.
///
/// All variants count as an I/O failure for the upload pass: the batch is
/// not retried within the run and the run's health flag is raised. The next
/// scheduled run is the retry mechanism.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a usable response (DNS, connect, TLS,
    /// timeout, body read).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Ingestion endpoint error (status {status}): {message}")]
    Api { status: u16, message: String },
}
