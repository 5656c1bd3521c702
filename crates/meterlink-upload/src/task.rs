use std::mem;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use meterlink_channels::{Channel, ChannelError, ChannelRegistry};
use meterlink_core::config::TWENTY_FOUR_HOURS_MS;
use meterlink_core::time::format_instant;
use meterlink_core::{MeterReading, ReadingBatch, RunOutcome};
use meterlink_transport::IngestTransport;

/// Executes one upload pass per trigger.
///
/// The default lookback window is 24 hours. If more than 5000 readings are
/// found in the window, several transmissions are performed automatically: a
/// batch goes out the instant it fills, so one transmitted batch may mix
/// readings from several channels when a channel boundary falls mid-batch.
pub struct UploadTask {
    registry: Arc<dyn ChannelRegistry>,
    transport: Arc<dyn IngestTransport>,
    data_range_ms: i64,
    status_channel: Option<Arc<dyn Channel>>,
}

impl UploadTask {
    pub fn new(registry: Arc<dyn ChannelRegistry>, transport: Arc<dyn IngestTransport>) -> Self {
        Self {
            registry,
            transport,
            data_range_ms: TWENTY_FOUR_HOURS_MS,
            status_channel: None,
        }
    }

    /// Override the lookback window. The configuration layer rejects
    /// non-positive values before scheduling; the task itself accepts any
    /// value so a zero window can be exercised directly.
    pub fn with_data_range(mut self, data_range_ms: i64) -> Self {
        self.data_range_ms = data_range_ms;
        self
    }

    /// Set the channel that receives the boolean health flag (true = error)
    /// after each completed or aborted run.
    pub fn with_status_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.status_channel = Some(channel);
        self
    }

    /// Execute one upload pass starting now.
    pub async fn run(&self) -> RunOutcome {
        self.run_at(Utc::now().timestamp_millis()).await
    }

    /// Execute one upload pass with an explicit start instant.
    ///
    /// Records with `timestamp_ms >= start_time_ms - data_range_ms` are
    /// eligible (inclusive lower bound). All steps are sequential; the only
    /// suspension points are channel fetches and batch transmissions.
    pub async fn run_at(&self, start_time_ms: i64) -> RunOutcome {
        let since_ms = start_time_ms - self.data_range_ms;
        let channel_ids = self.registry.channel_ids().await;

        let mut batch = ReadingBatch::new();
        let mut record_count: usize = 0;
        let mut sent: usize = 0;

        for channel_id in &channel_ids {
            let Some(channel) = self.registry.channel(channel_id).await else {
                warn!(channel = %channel_id, "channel disappeared after enumeration, skipping");
                continue;
            };

            match channel.logged_records_since(since_ms).await {
                Ok(records) => {
                    for record in records {
                        batch.push(MeterReading::new(
                            channel_id.clone(),
                            record.timestamp_ms,
                            record.value,
                        ));
                        record_count += 1;

                        if batch.is_full() {
                            let full = mem::take(&mut batch);
                            match self.transport.transmit(&full).await {
                                Ok(ack) => {
                                    sent += full.len();
                                    debug!(
                                        readings = full.len(),
                                        ack = %ack,
                                        "sent full batch to ingestion endpoint"
                                    );
                                }
                                Err(e) => {
                                    error!(error = %e, "error while sending readings to ingestion endpoint");
                                    self.set_status(true).await;
                                    return self.outcome(start_time_ms, sent, true);
                                }
                            }
                        }
                    }
                }
                Err(ChannelError::LoggerUnavailable(reason)) => {
                    // One unreachable logger means the rest are unreachable
                    // too; batches already transmitted stay transmitted.
                    error!(
                        channel = %channel_id,
                        %reason,
                        "data logger not available, upload task stopped"
                    );
                    self.set_status(true).await;
                    return self.outcome(start_time_ms, sent, true);
                }
                Err(e) => {
                    error!(channel = %channel_id, error = %e, "error while retrieving logged records");
                }
            }
        }

        if record_count == 0 {
            // Not an error: the status channel keeps its previous value.
            warn!(
                from = %format_instant(since_ms),
                to = %format_instant(start_time_ms),
                "no records found to send in window"
            );
            return self.outcome(start_time_ms, 0, false);
        }

        if !batch.is_empty() {
            match self.transport.transmit(&batch).await {
                Ok(ack) => {
                    sent += batch.len();
                    self.set_status(false).await;
                    let outcome = self.outcome(start_time_ms, sent, false);
                    info!(
                        records = outcome.records_sent,
                        elapsed_ms = outcome.elapsed_ms,
                        ack = %ack,
                        "transfer to ingestion endpoint finished"
                    );
                    return outcome;
                }
                Err(e) => {
                    error!(error = %e, "error while sending readings to ingestion endpoint");
                    self.set_status(true).await;
                    return self.outcome(start_time_ms, sent, true);
                }
            }
        }

        // The total was an exact multiple of the batch cap: everything
        // already went out mid-run and there is no final batch to send.
        self.set_status(false).await;
        let outcome = self.outcome(start_time_ms, sent, false);
        info!(
            records = outcome.records_sent,
            elapsed_ms = outcome.elapsed_ms,
            "transfer to ingestion endpoint finished"
        );
        outcome
    }

    /// Write the health flag to the status channel, if one is configured.
    /// Write failures are logged and otherwise ignored.
    async fn set_status(&self, error: bool) {
        if let Some(ref channel) = self.status_channel {
            if let Err(e) = channel.write_flag(error).await {
                warn!(channel = %channel.id(), error = %e, "could not write status flag");
            }
        }
    }

    fn outcome(&self, start_time_ms: i64, records_sent: usize, failed: bool) -> RunOutcome {
        RunOutcome {
            records_sent,
            elapsed_ms: Utc::now().timestamp_millis() - start_time_ms,
            failed,
        }
    }
}
