//! Notification abstraction — one text message to a fixed destination.

pub mod twilio;

use async_trait::async_trait;

use crate::error::NotifyError;

pub use twilio::TwilioNotifier;

/// Provider acknowledgement for a delivered message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    /// Provider-assigned message id, for log correlation.
    pub message_id: String,
}

/// A channel that delivers a single text message to a fixed destination.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, body: &str) -> Result<DeliveryReceipt, NotifyError>;
}
