//! Gmail adapter — unread listing and read-state mutation over the REST API.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{FetchError, MarkReadError};
use crate::mail::auth::TokenStore;
use crate::mail::{MailItem, MailSource, truncate_preview};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Shown when a message carries no decodable text part.
const NO_BODY_FALLBACK: &str = "No body content available";

/// Gmail mailbox behind an authorized-user credential.
pub struct GmailSource {
    tokens: TokenStore,
    client: reqwest::Client,
}

impl GmailSource {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{GMAIL_API_BASE}/users/me/{path}")
    }

    /// Fetch the full form of one message and reduce it to a summary.
    async fn fetch_summary(&self, token: &str, id: &str) -> Result<MailItem, FetchError> {
        let detail: Value = self
            .client
            .get(self.api_url(&format!("messages/{id}")))
            .query(&[("format", "full")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                reason: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Status {
                status: e.status().map_or(0, |s| s.as_u16()),
                body: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| FetchError::Http {
                reason: format!("malformed message payload: {e}"),
            })?;

        Ok(summarize(id, &detail))
    }
}

#[async_trait::async_trait]
impl MailSource for GmailSource {
    async fn list_unread(&self, limit: usize) -> Result<Vec<MailItem>, FetchError> {
        let token = self.tokens.access_token().await?;

        let max_results = limit.to_string();
        let listing: Value = self
            .client
            .get(self.api_url("messages"))
            .query(&[
                ("labelIds", "INBOX"),
                ("labelIds", "UNREAD"),
                ("maxResults", max_results.as_str()),
            ])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| FetchError::Http {
                reason: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Status {
                status: e.status().map_or(0, |s| s.as_u16()),
                body: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| FetchError::Http {
                reason: format!("malformed listing: {e}"),
            })?;

        let Some(refs) = listing.get("messages").and_then(Value::as_array) else {
            tracing::info!("No unread messages found");
            return Ok(Vec::new());
        };

        let mut items = Vec::new();
        for msg_ref in refs.iter().take(limit) {
            let Some(id) = msg_ref.get("id").and_then(Value::as_str) else {
                continue;
            };
            items.push(self.fetch_summary(&token, id).await?);
        }

        Ok(items)
    }

    async fn mark_read(&self, id: &str) -> Result<(), MarkReadError> {
        let token = self.tokens.access_token().await?;

        let resp = self
            .client
            .post(self.api_url(&format!("messages/{id}/modify")))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await
            .map_err(|e| MarkReadError::Http {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(MarkReadError::Status {
                id: id.to_string(),
                status: resp.status().as_u16(),
            });
        }

        Ok(())
    }
}

// ── Payload reduction (public for testing) ──────────────────────────

/// Reduce a `format=full` message payload to a [`MailItem`].
pub fn summarize(id: &str, detail: &Value) -> MailItem {
    let sender = header(detail, "From").unwrap_or("unknown").to_string();
    let subject = header(detail, "Subject").unwrap_or("(no subject)").to_string();

    let timestamp = detail
        .get("internalDate")
        .and_then(Value::as_str)
        .and_then(|ms| ms.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    MailItem {
        id: id.to_string(),
        sender,
        subject,
        timestamp,
        body_preview: truncate_preview(&body_text(detail)),
    }
}

/// Look up one header value by name.
fn header<'a>(detail: &'a Value, name: &str) -> Option<&'a str> {
    detail
        .pointer("/payload/headers")?
        .as_array()?
        .iter()
        .find(|h| h.get("name").and_then(Value::as_str) == Some(name))?
        .get("value")?
        .as_str()
}

/// Extract the plain-text body: the first `text/plain` MIME part if the
/// message is multipart, else the top-level body, else a fixed fallback.
fn body_text(detail: &Value) -> String {
    let Some(payload) = detail.get("payload") else {
        return NO_BODY_FALLBACK.to_string();
    };

    if let Some(parts) = payload.get("parts").and_then(Value::as_array) {
        for part in parts {
            if part.get("mimeType").and_then(Value::as_str) == Some("text/plain")
                && let Some(text) = part
                    .pointer("/body/data")
                    .and_then(Value::as_str)
                    .and_then(decode_body)
            {
                return text;
            }
        }
    }

    payload
        .pointer("/body/data")
        .and_then(Value::as_str)
        .and_then(decode_body)
        .unwrap_or_else(|| NO_BODY_FALLBACK.to_string())
}

/// Decode Gmail's urlsafe-base64 body data.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(body: &str) -> String {
        URL_SAFE_NO_PAD.encode(body)
    }

    fn full_message(body_b64: &str) -> Value {
        json!({
            "id": "m1",
            "internalDate": "1754300000000",
            "payload": {
                "headers": [
                    { "name": "From", "value": "alice@example.com" },
                    { "name": "Subject", "value": "Quarterly numbers" },
                ],
                "parts": [
                    { "mimeType": "text/html", "body": { "data": encode("<p>hi</p>") } },
                    { "mimeType": "text/plain", "body": { "data": body_b64 } },
                ],
            },
        })
    }

    #[test]
    fn summarize_reads_headers_and_plain_part() {
        let detail = full_message(&encode("hello there"));
        let item = summarize("m1", &detail);

        assert_eq!(item.id, "m1");
        assert_eq!(item.sender, "alice@example.com");
        assert_eq!(item.subject, "Quarterly numbers");
        assert_eq!(item.body_preview, "hello there");
    }

    #[test]
    fn summarize_parses_internal_date_millis() {
        let detail = full_message(&encode("x"));
        let item = summarize("m1", &detail);
        assert_eq!(item.timestamp.timestamp_millis(), 1_754_300_000_000);
    }

    #[test]
    fn summarize_falls_back_on_missing_headers() {
        let detail = json!({
            "payload": { "headers": [], "body": { "data": encode("plain") } }
        });
        let item = summarize("m2", &detail);
        assert_eq!(item.sender, "unknown");
        assert_eq!(item.subject, "(no subject)");
        assert_eq!(item.body_preview, "plain");
    }

    #[test]
    fn body_text_uses_top_level_body_when_not_multipart() {
        let detail = json!({
            "payload": { "body": { "data": encode("single-part body") } }
        });
        assert_eq!(body_text(&detail), "single-part body");
    }

    #[test]
    fn body_text_falls_back_when_nothing_decodable() {
        let detail = json!({ "payload": { "mimeType": "text/html" } });
        assert_eq!(body_text(&detail), NO_BODY_FALLBACK);
    }

    #[test]
    fn long_bodies_are_truncated_in_the_summary() {
        let detail = full_message(&encode(&"a".repeat(500)));
        let item = summarize("m1", &detail);
        assert!(item.body_preview.ends_with("..."));
        assert!(item.body_preview.chars().count() < 500);
    }

    #[test]
    fn decode_body_accepts_padded_input() {
        // "hi" in padded urlsafe form.
        assert_eq!(decode_body("aGk=").as_deref(), Some("hi"));
    }

    #[test]
    fn decode_body_rejects_garbage() {
        assert!(decode_body("!!not-base64!!").is_none());
    }
}
