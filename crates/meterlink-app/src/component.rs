use std::sync::Arc;

use tracing::{info, warn};

use meterlink_channels::ChannelRegistry;
use meterlink_core::{ConfigError, MeterlinkConfig};
use meterlink_scheduler::{spawn_worker, ScheduleSpec, UploadScheduler};
use meterlink_transport::HttpIngestClient;
use meterlink_upload::UploadTask;

/// The upload component as embedded in a host.
///
/// Created once with the host's channel registry, then driven by
/// configuration updates. Until the first valid configuration arrives no
/// timer is armed and nothing is uploaded.
pub struct MeterlinkApp {
    registry: Arc<dyn ChannelRegistry>,
    scheduler: UploadScheduler,
}

impl MeterlinkApp {
    pub fn new(registry: Arc<dyn ChannelRegistry>) -> Self {
        info!("meterlink app activated, waiting for configuration");
        Self {
            registry,
            scheduler: UploadScheduler::new(),
        }
    }

    /// Apply a configuration update.
    ///
    /// Validates first; on error the previous schedule (if any) stays armed
    /// untouched. On success the transport, upload task and worker are
    /// rebuilt and the timer is re-armed, phase-aligned to the configured
    /// anchor. Safe to call repeatedly. An upload run already in flight is
    /// not cancelled.
    pub async fn apply_config(&mut self, config: &MeterlinkConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let anchor_ms = config.anchor_ms()?;

        let transport = Arc::new(HttpIngestClient::new(
            &config.ingest_url,
            &config.username,
            &config.password,
            config.delete_file_after_upload,
        ));

        let mut task = UploadTask::new(self.registry.clone(), transport)
            .with_data_range(config.data_range_ms);

        if let Some(ref id) = config.report_error_channel_id {
            match self.registry.channel(id).await {
                Some(channel) => task = task.with_status_channel(channel),
                None => {
                    warn!(channel = %id, "status channel not found, running without health reporting");
                }
            }
        }

        let trigger = spawn_worker(task);
        self.scheduler.reschedule(
            ScheduleSpec {
                anchor_ms,
                interval_ms: config.upload_interval_ms,
            },
            trigger,
        );

        info!(
            interval_ms = config.upload_interval_ms,
            data_range_ms = config.data_range_ms,
            "upload schedule armed"
        );
        Ok(())
    }

    /// Disarm the timer. Idempotent; an in-flight run completes on its own.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel();
        info!("meterlink app deactivated");
    }
}
