use serde::{Deserialize, Serialize};

/// Maximum number of readings in a single transmission to the ingestion
/// endpoint. A batch is transmitted and replaced the instant it reaches
/// this size.
pub const MAX_BATCH_READINGS: usize = 5000;

/// A single logged value as returned by one data channel.
///
/// The sequence a channel returns is source-defined; callers must treat the
/// ordering as arbitrary (in particular, not sorted by timestamp).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// The logged value.
    pub value: f64,
}

impl Record {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// One reading as transmitted to the ingestion endpoint: a [`Record`] tagged
/// with the channel it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterReading {
    pub channel_id: String,
    pub timestamp_ms: i64,
    pub value: f64,
}

impl MeterReading {
    pub fn new(channel_id: impl Into<String>, timestamp_ms: i64, value: f64) -> Self {
        Self {
            channel_id: channel_id.into(),
            timestamp_ms,
            value,
        }
    }
}

/// An ordered accumulation of readings queued for one transmission call.
///
/// Created empty, filled incrementally during a single upload pass and
/// discarded after transmission; no batch outlives a run. When a channel
/// boundary falls mid-batch, one transmitted batch can mix readings from
/// several channels — that is intentional.
#[derive(Debug, Default, Serialize)]
pub struct ReadingBatch {
    readings: Vec<MeterReading>,
}

impl ReadingBatch {
    pub fn new() -> Self {
        Self {
            readings: Vec::new(),
        }
    }

    /// Append one reading. Callers check [`ReadingBatch::is_full`] after
    /// each push and transmit immediately when the cap is reached.
    pub fn push(&mut self, reading: MeterReading) {
        self.readings.push(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// True once the batch holds [`MAX_BATCH_READINGS`] entries.
    pub fn is_full(&self) -> bool {
        self.readings.len() >= MAX_BATCH_READINGS
    }

    pub fn readings(&self) -> &[MeterReading] {
        &self.readings
    }
}

/// Outcome of one upload pass. Derived per run, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Total readings handed to the transport across all transmissions.
    pub records_sent: usize,
    /// Wall time of the pass in milliseconds.
    pub elapsed_ms: i64,
    /// True when the run aborted or a transmission failed.
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_is_not_full() {
        let batch = ReadingBatch::new();
        assert!(batch.is_empty());
        assert!(!batch.is_full());
        assert_eq!(batch.len(), 0);
    }

    #[test]
    fn batch_full_at_cap() {
        let mut batch = ReadingBatch::new();
        for i in 0..MAX_BATCH_READINGS {
            batch.push(MeterReading::new("ch1", i as i64, i as f64));
            if i + 1 < MAX_BATCH_READINGS {
                assert!(!batch.is_full());
            }
        }
        assert!(batch.is_full());
        assert_eq!(batch.len(), MAX_BATCH_READINGS);
    }

    #[test]
    fn batch_preserves_push_order() {
        let mut batch = ReadingBatch::new();
        batch.push(MeterReading::new("b", 2, 2.0));
        batch.push(MeterReading::new("a", 1, 1.0));
        let ids: Vec<&str> = batch.readings().iter().map(|r| r.channel_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn reading_serializes_flat() {
        let reading = MeterReading::new("meter.power", 1_700_000_000_000, 42.5);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains(r#""channel_id":"meter.power""#));
        assert!(json.contains(r#""timestamp_ms":1700000000000"#));
    }
}
