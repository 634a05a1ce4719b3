//! services/api/src/adapters/gigachat/credential.rs
//!
//! The bearer credential cache shared by every request going through one
//! `GigaChatAdapter`.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Subtracted from a provider-declared expiry so a token never runs out mid-request.
pub const EXPIRY_SAFETY_MARGIN_MINUTES: i64 = 5;

/// Validity assumed when the provider does not declare an expiry.
pub const DEFAULT_VALIDITY_MINUTES: i64 = 25;

const TOKEN_PREVIEW_CHARS: usize = 8;

#[derive(Clone)]
pub(crate) struct CachedCredential {
    pub(crate) token: String,
    pub(crate) expires_at: DateTime<Utc>,
}

impl CachedCredential {
    pub(crate) fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Body of a successful token endpoint response.
///
/// `expires_at` is kept loose: a non-numeric value is ignored rather than
/// failing the whole parse.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: Option<String>,
    #[serde(default)]
    pub(crate) expires_at: Option<serde_json::Value>,
}

impl TokenResponse {
    /// The declared expiry in epoch milliseconds, if it is a positive number.
    pub(crate) fn expires_at_millis(&self) -> Option<i64> {
        self.expires_at
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .filter(|ms| *ms > 0)
    }
}

/// Computes when a freshly issued token stops being used.
///
/// A declared absolute expiry loses the safety margin; without one the token
/// gets a flat default window from `now`.
pub(crate) fn credential_expiry(now: DateTime<Utc>, expires_at_millis: Option<i64>) -> DateTime<Utc> {
    match expires_at_millis.and_then(DateTime::<Utc>::from_timestamp_millis) {
        Some(declared) => declared - Duration::minutes(EXPIRY_SAFETY_MARGIN_MINUTES),
        None => now + Duration::minutes(DEFAULT_VALIDITY_MINUTES),
    }
}

/// A bounded prefix of a token, safe to write to logs.
pub(crate) fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(TOKEN_PREVIEW_CHARS).collect();
    format!("{}...", head)
}

/// Holds at most one credential. Each method is a single short critical
/// section; no lock is held across network I/O.
#[derive(Default)]
pub(crate) struct CredentialCache {
    slot: Mutex<Option<CachedCredential>>,
}

impl CredentialCache {
    /// Returns the cached token if it is still valid at `now`.
    pub(crate) async fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|credential| credential.is_valid_at(now))
            .map(|credential| credential.token.clone())
    }

    /// Replaces the cached credential wholesale.
    pub(crate) async fn store(&self, credential: CachedCredential) {
        *self.slot.lock().await = Some(credential);
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> Option<CachedCredential> {
        self.slot.lock().await.clone()
    }
}
