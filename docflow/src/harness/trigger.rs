//! Orchestrator trigger.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::errors::{PipelineError, PipelineResult};

/// The orchestrator's reply to a trigger call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerResponse {
    /// Identifier of the started execution.
    #[serde(rename = "executionArn")]
    pub execution_arn: String,
}

/// Starts a pipeline run over a storage prefix.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    /// Sends one trigger request for `directory`. Never retried.
    async fn trigger(&self, directory: &str) -> PipelineResult<TriggerResponse>;
}

/// Triggers over HTTP: `POST <url>` with `{"directory": ...}`.
#[derive(Debug, Clone)]
pub struct HttpTrigger {
    client: Client,
    url: String,
}

impl HttpTrigger {
    /// Creates a trigger for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> PipelineResult<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PipelineError::trigger(&url, format!("failed to build client: {err}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PipelineTrigger for HttpTrigger {
    async fn trigger(&self, directory: &str) -> PipelineResult<TriggerResponse> {
        info!(directory, url = %self.url, "Triggering processing");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({ "directory": directory }))
            .send()
            .await
            .map_err(|err| PipelineError::trigger(&self.url, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PipelineError::trigger(&self.url, format!("HTTP {status}: {body}")));
        }
        info!(status = status.as_u16(), "Trigger accepted");

        response
            .json::<TriggerResponse>()
            .await
            .map_err(|err| PipelineError::trigger(&self.url, format!("malformed response: {err}")))
    }
}
