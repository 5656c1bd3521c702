use std::sync::Arc;

use async_trait::async_trait;

use meterlink_core::Record;

use crate::error::ChannelError;

/// A handle to one named data channel.
///
/// Implementations must be `Send + Sync` so they can be stored in a registry
/// and driven from the upload worker task. The upload pass borrows handles
/// per run and never caches them across runs — channel membership may change
/// between runs.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable identifier for this channel (e.g. `"meter1.power"`).
    fn id(&self) -> &str;

    /// Return the logged records with `timestamp_ms >= since_ms`.
    ///
    /// The lower bound is inclusive, so with a zero lookback window a record
    /// stamped exactly at the run's start instant is still returned. The
    /// ordering of the returned sequence is source-defined.
    async fn logged_records_since(&self, since_ms: i64) -> Result<Vec<Record>, ChannelError>;

    /// Write a boolean flag to the channel.
    ///
    /// Only meaningful for status channels; data-only implementations may
    /// return [`ChannelError::WriteFailed`].
    async fn write_flag(&self, value: bool) -> Result<(), ChannelError>;
}

/// The set of channels currently known to the host.
///
/// The upload pass re-enumerates the registry on every run, so channels that
/// appear or disappear between runs are picked up automatically.
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// All channel ids, in the order the upload pass should visit them.
    async fn channel_ids(&self) -> Vec<String>;

    /// Look up a single channel. `None` when the id is unknown (e.g. the
    /// channel vanished after enumeration).
    async fn channel(&self, id: &str) -> Option<Arc<dyn Channel>>;
}
