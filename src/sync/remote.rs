//! Remote store the sync engine delivers notes to.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::record::NotePayload;
use crate::config::RemoteConfig;
use crate::error::NotesError;

/// Header carrying the client-generated record id.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// The authoritative backend accepting finalized notes.
///
/// `key` identifies the note across retries. Delivery is at-least-once, so
/// the backend is expected to deduplicate on it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Deliver one note.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::DeliveryFailed` on any transport or remote error.
    async fn deliver(&self, key: &str, payload: &NotePayload) -> Result<(), NotesError>;
}

/// Deliver with an upper bound on wall-clock time. A timeout is a failure.
///
/// # Errors
///
/// Returns `NotesError::DeliveryFailed` if delivery fails or times out.
pub async fn deliver_within(
    remote: &dyn RemoteStore,
    key: &str,
    payload: &NotePayload,
    limit: Duration,
) -> Result<(), NotesError> {
    tokio::time::timeout(limit, remote.deliver(key, payload))
        .await
        .map_err(|_| NotesError::DeliveryFailed(format!("timed out after {limit:?}")))?
}

#[derive(Debug, Serialize)]
struct DeliveryBody<'a> {
    id: &'a str,
    profile_url: &'a str,
    note: &'a str,
    created_at: DateTime<Utc>,
}

/// JSON-over-HTTP remote store.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRemoteStore {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotesError::Config` if the HTTP client cannot be built.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, NotesError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| NotesError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn deliver(&self, key: &str, payload: &NotePayload) -> Result<(), NotesError> {
        let body = DeliveryBody {
            id: key,
            profile_url: &payload.profile_url,
            note: &payload.note,
            created_at: payload.created_at,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(IDEMPOTENCY_HEADER, key)
            .json(&body);
        if let Some(token) = &self.api_key {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotesError::DeliveryFailed(format!(
                "remote store returned {status}"
            )));
        }

        debug!(%key, %status, "note delivered");
        Ok(())
    }
}
