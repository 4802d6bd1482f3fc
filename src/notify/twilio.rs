//! Twilio adapter — WhatsApp delivery through the Messages API.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::RelayConfig;
use crate::error::NotifyError;
use crate::notify::{DeliveryReceipt, Notifier};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio's "daily WhatsApp message limit reached" error code. Permanent for
/// the period; retrying cannot succeed until the quota resets.
const QUOTA_EXHAUSTED_CODE: i64 = 63038;

/// WhatsApp sender behind Twilio's Messages API.
pub struct TwilioNotifier {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    to_number: String,
    client: reqwest::Client,
}

impl TwilioNotifier {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.from_number.clone(),
            to_number: config.to_number.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

#[async_trait::async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, body: &str) -> Result<DeliveryReceipt, NotifyError> {
        let params = [
            ("Body", body),
            ("From", &self.from_number),
            ("To", &self.to_number),
        ];

        let resp = self
            .client
            .post(self.api_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotifyError::Transient {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let payload: Value = resp.json().await.map_err(|e| NotifyError::Transient {
            reason: format!("malformed response: {e}"),
        })?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &payload));
        }

        let sid = payload
            .get("sid")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        tracing::info!(sid = %sid, "WhatsApp message sent");
        Ok(DeliveryReceipt { message_id: sid })
    }
}

/// Map a Twilio error payload onto the delivery taxonomy.
fn classify_failure(status: u16, payload: &Value) -> NotifyError {
    let code = payload.get("code").and_then(Value::as_i64);
    if code == Some(QUOTA_EXHAUSTED_CODE) {
        return NotifyError::QuotaExhausted;
    }

    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no error message");
    NotifyError::Transient {
        reason: format!("{status}: {message} (code {code:?})"),
    }
}
