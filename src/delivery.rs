//! Delivery policy — bounded exponential-backoff retry around a notifier.
//!
//! The only retry logic in the system. Mailbox calls are never retried
//! within a cycle; a failed fetch waits for the next scheduled tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::NotifyError;
use crate::notify::Notifier;

/// Wraps a notifier with retry/backoff and a hard stop on quota exhaustion.
pub struct DeliveryPolicy {
    notifier: Arc<dyn Notifier>,
    max_retries: u32,
}

impl DeliveryPolicy {
    pub fn new(notifier: Arc<dyn Notifier>, max_retries: u32) -> Self {
        Self {
            notifier,
            max_retries,
        }
    }

    /// Attempt delivery, retrying transient failures with `2^attempt` second
    /// backoff up to the retry limit. Quota exhaustion fails immediately:
    /// retrying cannot succeed within the same period.
    ///
    /// Returns whether the message was confirmed sent.
    pub async fn deliver(&self, body: &str) -> bool {
        let mut attempt: u32 = 0;
        loop {
            match self.notifier.send(body).await {
                Ok(receipt) => {
                    debug!(message_id = %receipt.message_id, "Notification delivered");
                    return true;
                }
                Err(NotifyError::QuotaExhausted) => {
                    error!("Messaging quota exhausted, skipping further attempts");
                    return false;
                }
                Err(NotifyError::Transient { reason }) => {
                    if attempt >= self.max_retries {
                        error!(attempts = attempt + 1, "Max delivery retries reached");
                        return false;
                    }
                    let backoff = Duration::from_secs(1u64 << attempt);
                    warn!(
                        attempt = attempt + 1,
                        backoff_secs = backoff.as_secs(),
                        "Delivery failed ({reason}), retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::notify::DeliveryReceipt;

    /// Fails with a transient error for the first `fail_first` calls, then
    /// succeeds.
    struct FlakyNotifier {
        fail_first: usize,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Notifier for FlakyNotifier {
        async fn send(&self, _body: &str) -> Result<DeliveryReceipt, NotifyError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(NotifyError::Transient {
                    reason: "connection reset".into(),
                })
            } else {
                Ok(DeliveryReceipt {
                    message_id: format!("SM{call}"),
                })
            }
        }
    }

    struct QuotaNotifier {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Notifier for QuotaNotifier {
        async fn send(&self, _body: &str) -> Result<DeliveryReceipt, NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(NotifyError::QuotaExhausted)
        }
    }

    #[tokio::test]
    async fn first_attempt_success_needs_one_call() {
        let notifier = Arc::new(FlakyNotifier {
            fail_first: 0,
            calls: AtomicUsize::new(0),
        });
        let policy = DeliveryPolicy::new(notifier.clone(), 3);

        assert!(policy.deliver("hi").await);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn quota_exhaustion_short_circuits_with_one_call() {
        let notifier = Arc::new(QuotaNotifier {
            calls: AtomicUsize::new(0),
        });
        let policy = DeliveryPolicy::new(notifier.clone(), 3);

        assert!(!policy.deliver("hi").await);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_transient_failures_back_off_then_succeed() {
        let notifier = Arc::new(FlakyNotifier {
            fail_first: 2,
            calls: AtomicUsize::new(0),
        });
        let policy = DeliveryPolicy::new(notifier.clone(), 3);

        let started = tokio::time::Instant::now();
        assert!(policy.deliver("hi").await);

        assert_eq!(notifier.calls.load(Ordering::SeqCst), 3);
        // 2^0 + 2^1 seconds of backoff.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhaust_after_max_attempts() {
        let notifier = Arc::new(FlakyNotifier {
            fail_first: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        let policy = DeliveryPolicy::new(notifier.clone(), 3);

        assert!(!policy.deliver("hi").await);
        // 3 retries = 4 total attempts.
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let notifier = Arc::new(FlakyNotifier {
            fail_first: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        let policy = DeliveryPolicy::new(notifier.clone(), 0);

        assert!(!policy.deliver("hi").await);
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }
}
