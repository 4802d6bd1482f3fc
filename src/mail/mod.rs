//! Mailbox abstraction — unread-message listing and read-state mutation.

pub mod auth;
pub mod gmail;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, MarkReadError};

pub use gmail::GmailSource;

/// Body previews are cut to this many characters.
pub const PREVIEW_MAX_CHARS: usize = 200;

/// An unread message summary, immutable once fetched. Lives only for the
/// cycle that fetched it.
#[derive(Debug, Clone, PartialEq)]
pub struct MailItem {
    /// Provider-assigned unique id.
    pub id: String,
    /// Sender address as reported by the provider.
    pub sender: String,
    pub subject: String,
    /// Provider-assigned receipt time.
    pub timestamp: DateTime<Utc>,
    /// Plain-text body, truncated to [`PREVIEW_MAX_CHARS`].
    pub body_preview: String,
}

/// A mailbox that can list unread messages and mark them read.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetch up to `limit` unread message summaries. Ordering is
    /// provider-determined.
    async fn list_unread(&self, limit: usize) -> Result<Vec<MailItem>, FetchError>;

    /// Mark one message as read upstream.
    async fn mark_read(&self, id: &str) -> Result<(), MarkReadError>;
}

/// Truncate a body to the preview length, appending a marker when cut.
/// Cuts on a char boundary, never mid-codepoint.
pub fn truncate_preview(body: &str) -> String {
    let mut chars = body.char_indices();
    match chars.nth(PREVIEW_MAX_CHARS) {
        Some((byte_idx, _)) => format!("{}...", &body[..byte_idx]),
        None => body.to_string(),
    }
}
