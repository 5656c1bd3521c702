use thiserror::Error;

/// Errors surfaced at configuration time.
///
/// A run is never scheduled while the configuration is invalid; these are
/// reported to the host once and the component keeps its previous schedule
/// (or stays idle when none was armed yet).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required option is absent or empty. The two cases are not
    /// distinguishable after defaulting: an option the host never set
    /// arrives as an empty string.
    #[error("Configuration option '{0}' is missing or empty")]
    EmptyField(&'static str),

    /// A numeric option is out of its allowed range.
    #[error("Configuration option '{field}' is invalid: {reason}")]
    InvalidNumber { field: &'static str, reason: String },

    /// A timestamp option could not be parsed.
    #[error("Configuration option '{field}' is not a valid date: {reason}")]
    InvalidDate { field: &'static str, reason: String },

    /// The configuration source itself could not be read or merged.
    #[error("Configuration error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
