// REST snapshot fetcher: battle metadata, the task catalog, and answer
// submission.
//
// Each call is a single request/response with no internal retry; refresh
// cadence and retry policy belong to the caller. The live channel, not this
// client, is the primary source of freshness for fast-changing fields.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::protocol::{Battle, SubmitAnswerRequest, SubmitAnswerResponse, Task};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server returned status {status}")]
    Server { status: StatusCode },
}

/// Classify a non-success HTTP status into a [`FetchError`].
pub(crate) fn status_error(status: StatusCode, resource: &str) -> FetchError {
    if status == StatusCode::NOT_FOUND {
        FetchError::NotFound {
            resource: resource.to_string(),
        }
    } else {
        FetchError::Server { status }
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Thin client over the platform's REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the application config.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        ApiClient::new(
            &config.server.api_base_url,
            Duration::from_secs(config.server.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch the durable metadata for one battle.
    pub async fn fetch_battle(&self, battle_id: &str) -> Result<Battle, FetchError> {
        let url = self.url(&format!("/battles/{battle_id}"));
        debug!(url = %url, "fetching battle snapshot");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &format!("battle {battle_id}")));
        }
        Ok(response.json().await?)
    }

    /// Fetch the full task catalog, in server order.
    pub async fn fetch_tasks(&self) -> Result<Vec<Task>, FetchError> {
        let url = self.url("/tasks");
        debug!(url = %url, "fetching task catalog");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "task catalog"));
        }
        Ok(response.json().await?)
    }

    /// Submit an answer for a task.
    pub async fn submit_answer(
        &self,
        request: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, FetchError> {
        let url = self.url("/tasks/submit");
        debug!(url = %url, task_id = %request.task_id, "submitting answer");
        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &format!("task {}", request.task_id)));
        }
        Ok(response.json().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
