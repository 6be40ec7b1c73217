//! Outbound port to the external time-entry store
//!
//! Finished sessions are submitted as finalized records; the store is the
//! system of record for history and reporting. Submission failures are
//! surfaced to the caller but never roll back the local session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the bearer token for the time-entry API.
pub const API_TOKEN_ENV: &str = "PUNCHCLOCK_API_TOKEN";

/// A finalized tracking record, ready for the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTimeEntry {
    pub topic_id: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whole seconds. Natural completions carry the configured duration,
    /// manual stops the wall-clock delta.
    pub duration: u64,
}

/// Submission failure reported by the sink.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("time entry endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("time entry endpoint returned status {status}")]
    Rejected { status: u16 },
}

/// Port for submitting finalized time entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeEntrySink: Send + Sync {
    async fn submit(&self, entry: &NewTimeEntry) -> Result<(), SubmitError>;
}

/// HTTP implementation posting JSON entries to the backend REST API.
pub struct HttpTimeEntrySink {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpTimeEntrySink {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url,
            token,
        }
    }

    /// Build a sink for `url`, picking up the optional bearer token from
    /// `PUNCHCLOCK_API_TOKEN`.
    pub fn from_env(url: String) -> Self {
        Self::new(url, std::env::var(API_TOKEN_ENV).ok())
    }
}

#[async_trait]
impl TimeEntrySink for HttpTimeEntrySink {
    async fn submit(&self, entry: &NewTimeEntry) -> Result<(), SubmitError> {
        let mut request = self.client.post(&self.url).json(entry);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!(
            "Submitted time entry for {} ({}s)",
            entry.topic_id, entry.duration
        );
        Ok(())
    }
}
