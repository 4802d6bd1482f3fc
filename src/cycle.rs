//! One notification cycle — fetch unread, filter against the processed log,
//! deliver, record, mark read.
//!
//! Ordering per item is the core correctness invariant: an id is recorded
//! only after its notification is confirmed sent, and marked read only after
//! it is recorded. A crash between send and record duplicates at most one
//! notification; it never loses one.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::delivery::DeliveryPolicy;
use crate::mail::{MailItem, MailSource};
use crate::store::ProcessedStore;

/// Counts for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub skipped: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Orchestrates one poll of the mailbox.
pub struct NotificationCycle {
    source: Arc<dyn MailSource>,
    store: ProcessedStore,
    delivery: DeliveryPolicy,
    batch_size: usize,
}

impl NotificationCycle {
    pub fn new(
        source: Arc<dyn MailSource>,
        store: ProcessedStore,
        delivery: DeliveryPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            store,
            delivery,
            batch_size,
        }
    }

    /// Run one cycle. Never fails; every error is logged and absorbed so
    /// the scheduler stays alive.
    pub async fn run(&self) -> CycleReport {
        let mut report = CycleReport::default();

        info!("Checking for new messages");

        let items = match self.source.list_unread(self.batch_size).await {
            Ok(items) => items,
            Err(e) => {
                error!("Unread fetch failed: {e}");
                return report;
            }
        };
        report.fetched = items.len();

        let processed = match self.store.load().await {
            Ok(set) => set,
            Err(e) => {
                // Without the dedup set every previously-notified unread
                // message would be re-delivered; abort the cycle instead.
                error!("Cannot load processed log: {e}");
                return report;
            }
        };

        for item in &items {
            if processed.contains(&item.id) {
                debug!(id = %item.id, "Already notified, skipping");
                report.skipped += 1;
                continue;
            }

            let message = format_notification(item);

            if !self.delivery.deliver(&message).await {
                report.failed += 1;
                continue;
            }
            report.delivered += 1;

            if let Err(e) = self.store.record(&item.id).await {
                // Not recorded means not marked read either; the next
                // cycle re-delivers this item (duplicate, never a loss).
                error!(id = %item.id, error = %e, "Delivered but not recorded");
                continue;
            }

            match self.source.mark_read(&item.id).await {
                Ok(()) => debug!(id = %item.id, "Marked message read"),
                Err(e) => {
                    // Non-fatal: the item is refetched unread next cycle and
                    // skipped there as already-processed.
                    warn!(id = %item.id, error = %e, "Failed to mark message read");
                }
            }
        }

        report
    }
}

/// Format the notification text for one mail item. Pure function of the item.
pub fn format_notification(item: &MailItem) -> String {
    format!(
        "\u{1F4E7} New Email\nFrom: {}\nSubject: {}\nTime: {}\nPreview: {}",
        item.sender,
        item.subject,
        item.timestamp.format("%Y-%m-%d %H:%M:%S"),
        item.body_preview,
    )
}
