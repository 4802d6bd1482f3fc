//! Google authorized-user credential — token file load, refresh, rewrite.
//!
//! The interactive authorization that first creates the token file is a
//! deployment precondition; this module only consumes and refreshes it.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Refresh slightly before the provider-reported expiry to absorb clock skew.
const EXPIRY_SKEW_SECS: i64 = 60;

/// On-disk "authorized user" credential, as written by Google's
/// authorization flow. Unknown fields are preserved across rewrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    pub token: String,
    pub refresh_token: String,
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUser {
    /// Whether the access token needs refreshing at `now`.
    /// A credential without an expiry is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now,
            None => true,
        }
    }
}

/// Reusable credential persisted across process restarts.
pub struct TokenStore {
    path: PathBuf,
    client: reqwest::Client,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self {
            path: path.into(),
            client,
        }
    }

    /// Read and parse the token file. A missing file is an error here;
    /// without it the service cannot run at all.
    pub async fn load(&self) -> Result<AuthorizedUser, AuthError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AuthError::TokenFile {
                path: self.path.clone(),
                source: e,
            })?;
        serde_json::from_str(&raw).map_err(|e| AuthError::Malformed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Produce a currently-valid access token, refreshing and rewriting the
    /// file when the stored one has expired.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut user = self.load().await?;
        if user.is_expired(Utc::now()) {
            self.refresh(&mut user).await?;
            self.save(&user).await?;
        }
        Ok(user.token)
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), AuthError> {
        tracing::debug!("Access token expired, refreshing");

        let params = [
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .client
            .post(&user.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshFailed {
                reason: format!("{status}: {body}"),
            });
        }

        #[derive(Deserialize)]
        struct RefreshResponse {
            access_token: String,
            expires_in: Option<i64>,
        }

        let refreshed: RefreshResponse =
            resp.json().await.map_err(|e| AuthError::RefreshFailed {
                reason: format!("malformed token response: {e}"),
            })?;

        user.token = refreshed.access_token;
        user.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Ok(())
    }

    async fn save(&self, user: &AuthorizedUser) -> Result<(), AuthError> {
        let raw = serde_json::to_string_pretty(user).map_err(|e| AuthError::RefreshFailed {
            reason: format!("cannot serialize token file: {e}"),
        })?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| AuthError::Persist {
                path: self.path.clone(),
                source: e,
            })
    }
}
