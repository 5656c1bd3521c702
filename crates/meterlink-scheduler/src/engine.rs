use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use meterlink_core::time::format_instant;
use meterlink_upload::UploadTask;

use crate::schedule::{compute_next_run, ScheduleSpec};

/// Handle for enqueueing upload runs on the worker spawned by
/// [`spawn_worker`].
///
/// A fire is accepted only while no run is pending or executing: the busy
/// flag is raised when a trigger is accepted and lowered by the worker once
/// the run has completed, so a tick that lands mid-run is dropped entirely
/// rather than deferred to fire off-phase the moment the run finishes.
#[derive(Clone)]
pub struct Trigger {
    tx: mpsc::Sender<()>,
    busy: Arc<AtomicBool>,
    retired: Arc<AtomicBool>,
}

impl Trigger {
    /// Request one upload run. Returns false when the trigger was dropped
    /// because a run is already pending or executing, or because the worker
    /// has been retired.
    pub fn fire(&self) -> bool {
        if self.retired.load(Ordering::SeqCst) {
            return false;
        }
        if self.busy.swap(true, Ordering::SeqCst) {
            return false;
        }
        if self.tx.try_send(()).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Discard any still-pending trigger and stop the worker after the
    /// in-flight run, if one is executing, has completed on its own terms.
    fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }
}

/// Owns the single armed upload timer.
///
/// The timer task only enqueues triggers; it never runs the upload logic
/// itself, so a tick can never block scheduling. Rescheduling replaces the
/// armed timer atomically: exactly one timer is live at any time, repeated
/// reconfiguration never leaks a previous one, and the previous worker's
/// pending trigger (if any) is discarded so no run executes with a stale
/// task.
pub struct UploadScheduler {
    timer: Option<JoinHandle<()>>,
    trigger: Option<Trigger>,
}

impl UploadScheduler {
    pub fn new() -> Self {
        Self {
            timer: None,
            trigger: None,
        }
    }

    /// Disarm any existing timer, compute the next phase-aligned run and arm
    /// a fresh periodic timer for it.
    ///
    /// Each tick fires `trigger`; a tick that arrives while the previous run
    /// is still pending or executing is skipped with a warning instead of
    /// overlapping or queueing behind it.
    pub fn reschedule(&mut self, spec: ScheduleSpec, trigger: Trigger) {
        self.cancel();

        let now_ms = Utc::now().timestamp_millis();
        let next_ms = compute_next_run(spec.anchor_ms, spec.interval_ms, now_ms);
        let delay = Duration::from_millis((next_ms - now_ms) as u64);
        let period = Duration::from_millis(spec.interval_ms as u64);

        debug!(
            interval_ms = spec.interval_ms,
            next_run = %format_instant(next_ms),
            "armed upload timer"
        );

        let timer_trigger = trigger.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + delay, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if !timer_trigger.fire() {
                    warn!("upload trigger skipped: previous run still in progress or worker stopped");
                }
            }
        }));
        self.trigger = Some(trigger);
    }

    /// Disarm the timer and retire the worker. An in-flight upload run is
    /// not cancelled; it completes or aborts on its own terms, but a trigger
    /// that has not yet started a run is discarded.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(trigger) = self.trigger.take() {
            trigger.retire();
        }
    }
}

impl Default for UploadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UploadScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Spawn the dedicated upload worker and return its [`Trigger`].
///
/// The handoff queue has depth 1 and the trigger's busy flag stays raised
/// from the accepted fire until the run completes, so runs never overlap
/// and never queue behind one another. The worker exits once every trigger
/// clone is dropped or the trigger is retired by the scheduler.
pub fn spawn_worker(task: UploadTask) -> Trigger {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let busy = Arc::new(AtomicBool::new(false));
    let retired = Arc::new(AtomicBool::new(false));

    let trigger = Trigger {
        tx,
        busy: busy.clone(),
        retired: retired.clone(),
    };

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            // A trigger accepted before retirement is discarded, not run.
            if retired.load(Ordering::SeqCst) {
                break;
            }
            task.run().await;
            busy.store(false, Ordering::SeqCst);
        }
        debug!("upload worker stopped");
    });

    trigger
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use meterlink_channels::{MemoryChannel, MemoryRegistry};
    use meterlink_core::{ReadingBatch, Record};
    use meterlink_transport::{IngestTransport, TransportError};

    use super::*;

    const INTERVAL_MS: i64 = 50;

    fn spec() -> ScheduleSpec {
        ScheduleSpec {
            anchor_ms: 0,
            interval_ms: INTERVAL_MS,
        }
    }

    async fn settle() {
        // Let the paused clock auto-advance through a few timer periods.
        tokio::time::sleep(Duration::from_millis(5 * INTERVAL_MS as u64)).await;
    }

    fn task_with(transport: Arc<dyn IngestTransport>) -> UploadTask {
        let registry = Arc::new(MemoryRegistry::new());
        let channel = MemoryChannel::new("meter1");
        channel.log(Record::new(Utc::now().timestamp_millis(), 1.0));
        registry.register(Arc::new(channel));
        UploadTask::new(registry, transport)
    }

    /// Transport that reports every transmission over a channel so tests can
    /// await the worker deterministically.
    struct NotifyingTransport {
        sent: mpsc::UnboundedSender<usize>,
    }

    #[async_trait]
    impl IngestTransport for NotifyingTransport {
        async fn transmit(&self, batch: &ReadingBatch) -> Result<String, TransportError> {
            let _ = self.sent.send(batch.len());
            Ok("ok".into())
        }
    }

    /// Transport that announces the start of a transmission and then blocks
    /// until the test hands it a permit, simulating a long run.
    struct BlockingTransport {
        started: mpsc::UnboundedSender<()>,
        release: Arc<Semaphore>,
    }

    #[async_trait]
    impl IngestTransport for BlockingTransport {
        async fn transmit(&self, _batch: &ReadingBatch) -> Result<String, TransportError> {
            let _ = self.started.send(());
            self.release.acquire().await.unwrap().forget();
            Ok("ok".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_runs_upload_on_fire() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let trigger = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: sent_tx })));

        assert!(trigger.fire());
        assert_eq!(sent_rx.recv().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn fire_is_skipped_while_run_in_flight() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        let trigger = spawn_worker(task_with(Arc::new(BlockingTransport {
            started: started_tx,
            release: release.clone(),
        })));

        assert!(trigger.fire());
        started_rx.recv().await.unwrap();

        // Mid-run fires are dropped outright, not deferred.
        assert!(!trigger.fire());
        assert!(!trigger.fire());

        release.add_permits(1);
        settle().await;
        // The dropped fires must not have caused a second run.
        assert!(started_rx.try_recv().is_err());

        // Idle again: the next fire is accepted.
        assert!(trigger.fire());
        started_rx.recv().await.unwrap();
        release.add_permits(1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_upload_run() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let trigger = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: sent_tx })));

        let mut scheduler = UploadScheduler::new();
        scheduler.reschedule(spec(), trigger);

        assert_eq!(sent_rx.recv().await, Some(1));
        scheduler.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_run_skips_overlapping_ticks() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let release = Arc::new(Semaphore::new(0));
        let trigger = spawn_worker(task_with(Arc::new(BlockingTransport {
            started: started_tx,
            release: release.clone(),
        })));

        let mut scheduler = UploadScheduler::new();
        scheduler.reschedule(spec(), trigger);

        // First tick starts a run that outlives several timer periods.
        started_rx.recv().await.unwrap();
        settle().await;

        // Every tick during the run was skipped; none queued a second run.
        assert!(started_rx.try_recv().is_err());

        release.add_permits(1);
        scheduler.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_the_armed_timer() {
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let trigger1 = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: tx1 })));
        let trigger2 = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: tx2 })));

        let mut scheduler = UploadScheduler::new();
        scheduler.reschedule(spec(), trigger1);
        scheduler.reschedule(spec(), trigger2);

        settle().await;

        // Only the second timer is live.
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_ok());
        scheduler.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_trigger() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let trigger = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: sent_tx })));

        // Accepted but not yet picked up: on this single-threaded test
        // runtime the worker cannot run before the next await point.
        assert!(trigger.fire());

        let mut scheduler = UploadScheduler::new();
        scheduler.reschedule(spec(), trigger);
        scheduler.cancel();

        settle().await;
        // The pending trigger was discarded, not drained into a stale run.
        assert!(sent_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_disarms_timer() {
        let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
        let trigger = spawn_worker(task_with(Arc::new(NotifyingTransport { sent: sent_tx })));

        let mut scheduler = UploadScheduler::new();
        scheduler.reschedule(spec(), trigger);
        scheduler.cancel();

        settle().await;
        assert!(sent_rx.try_recv().is_err());
    }
}
