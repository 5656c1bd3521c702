use thiserror::Error;

/// Errors that can occur while reading from or writing to a data channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The data logger behind the channel is not available at all.
    ///
    /// Fatal for the whole upload pass: if one channel's logger is gone the
    /// remaining channels' loggers are assumed unreachable too.
    #[error("Data logger not available: {0}")]
    LoggerUnavailable(String),

    /// A transient I/O problem while fetching this channel's records.
    ///
    /// Recoverable: the upload pass logs it and continues with the next
    /// channel.
    #[error("I/O error: {0}")]
    Io(String),

    /// Writing the health flag to the status channel failed.
    #[error("Status write failed: {0}")]
    WriteFailed(String),
}
