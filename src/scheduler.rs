//! Fixed-interval driver for the notification cycle.
//!
//! Runs one cycle immediately at startup, then one per period until stopped.
//! A single cycle is in flight at a time; an overlong cycle delays the next
//! tick rather than skipping or overlapping it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cycle::NotificationCycle;

/// Spawn the scheduler loop.
///
/// Returns the task handle and a stop signal. Sending `true` stops the loop
/// at the next suspension point; an in-progress cycle runs to completion
/// first.
pub fn spawn_scheduler(
    cycle: Arc<NotificationCycle>,
    period: Duration,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Scheduler started, cycle every {}s", period.as_secs());

        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick fires immediately.
            tokio::select! {
                _ = tick.tick() => {}
                _ = stop_rx.changed() => {
                    info!("Scheduler stopping");
                    return;
                }
            }
            if *stop_rx.borrow() {
                info!("Scheduler stopping");
                return;
            }

            // Run the cycle on its own task so a defect in one cycle is
            // caught here instead of killing the loop.
            let cycle = Arc::clone(&cycle);
            match tokio::spawn(async move { cycle.run().await }).await {
                Ok(report) => {
                    info!(
                        fetched = report.fetched,
                        skipped = report.skipped,
                        delivered = report.delivered,
                        failed = report.failed,
                        "Cycle complete"
                    );
                }
                Err(e) => error!("Notification cycle panicked: {e}"),
            }
        }
    });

    (handle, stop_tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::delivery::DeliveryPolicy;
    use crate::error::{FetchError, MarkReadError, NotifyError};
    use crate::mail::{MailItem, MailSource};
    use crate::notify::{DeliveryReceipt, Notifier};
    use crate::store::ProcessedStore;

    /// Counts fetches; always empty inbox.
    struct CountingSource {
        fetches: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MailSource for CountingSource {
        async fn list_unread(&self, _limit: usize) -> Result<Vec<MailItem>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn mark_read(&self, _id: &str) -> Result<(), MarkReadError> {
            Ok(())
        }
    }

    struct NullNotifier;

    #[async_trait::async_trait]
    impl Notifier for NullNotifier {
        async fn send(&self, _body: &str) -> Result<DeliveryReceipt, NotifyError> {
            Ok(DeliveryReceipt {
                message_id: "SM0".into(),
            })
        }
    }

    fn empty_inbox_cycle(dir: &tempfile::TempDir) -> (Arc<NotificationCycle>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            fetches: AtomicUsize::new(0),
        });
        let notifier = Arc::new(NullNotifier);
        let cycle = NotificationCycle::new(
            source.clone(),
            ProcessedStore::new(dir.path().join("processed_ids.txt")),
            DeliveryPolicy::new(notifier, 0),
            10,
        );
        (Arc::new(cycle), source)
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let (cycle, source) = empty_inbox_cycle(&dir);

        let (handle, stop) = spawn_scheduler(cycle, Duration::from_secs(60));

        // Well under one period: the startup cycle must already have run.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_repeat_on_the_period() {
        let dir = tempfile::tempdir().unwrap();
        let (cycle, source) = empty_inbox_cycle(&dir);

        let (handle, stop) = spawn_scheduler(cycle, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_the_inter_cycle_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let (cycle, source) = empty_inbox_cycle(&dir);

        let (handle, stop) = spawn_scheduler(cycle, Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.send(true).unwrap();
        handle.await.unwrap();

        // Only the immediate startup cycle ran.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
