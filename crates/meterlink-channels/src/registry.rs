use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use meterlink_core::Record;

use crate::{
    channel::{Channel, ChannelRegistry},
    error::ChannelError,
};

/// In-memory [`Channel`] backed by a plain record list.
///
/// Intended for hosts that buffer records in process and for tests. Written
/// flags are retained so a monitoring harness can observe the health signal
/// the upload pass reported.
pub struct MemoryChannel {
    id: String,
    records: Mutex<Vec<Record>>,
    written_flags: Mutex<Vec<bool>>,
}

impl MemoryChannel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(Vec::new()),
            written_flags: Mutex::new(Vec::new()),
        }
    }

    pub fn with_records(id: impl Into<String>, records: Vec<Record>) -> Self {
        let channel = Self::new(id);
        *channel.records.lock().unwrap() = records;
        channel
    }

    /// Append one logged record.
    pub fn log(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }

    /// All boolean flags written to this channel, oldest first.
    pub fn written_flags(&self) -> Vec<bool> {
        self.written_flags.lock().unwrap().clone()
    }

    /// The most recently written flag, if any.
    pub fn last_flag(&self) -> Option<bool> {
        self.written_flags.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn logged_records_since(&self, since_ms: i64) -> Result<Vec<Record>, ChannelError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.timestamp_ms >= since_ms)
            .copied()
            .collect())
    }

    async fn write_flag(&self, value: bool) -> Result<(), ChannelError> {
        self.written_flags.lock().unwrap().push(value);
        Ok(())
    }
}

/// HashMap-backed [`ChannelRegistry`].
///
/// Channels are stored by their [`Channel::id`]; registering a channel with
/// an id that already exists replaces the previous one. Enumeration order is
/// sorted by id for deterministic runs.
#[derive(Default)]
pub struct MemoryRegistry {
    channels: Mutex<HashMap<String, Arc<dyn Channel>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. An existing channel with the same id is replaced.
    pub fn register(&self, channel: Arc<dyn Channel>) {
        let id = channel.id().to_string();
        info!(channel = %id, "registering channel");
        self.channels.lock().unwrap().insert(id, channel);
    }

    /// Remove a channel by id. Returns true when something was removed.
    pub fn unregister(&self, id: &str) -> bool {
        self.channels.lock().unwrap().remove(id).is_some()
    }
}

#[async_trait]
impl ChannelRegistry for MemoryRegistry {
    async fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.channels.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn channel(&self, id: &str) -> Option<Arc<dyn Channel>> {
        self.channels.lock().unwrap().get(id).cloned()
    }
}
