use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};
use crate::domain::{
    error::IngestionError,
    models::SubmissionResponse,
    ports::BatchSubmitter,
};

/// Posts batches as JSON to the remote ingestion API.
pub struct HttpBatchSubmitter {
    client: Client,
    api_url: String,
}

impl HttpBatchSubmitter {
    pub fn new(api_url: String, timeout: Duration) -> Result<Self, IngestionError> {
        debug!("Initializing HTTP submitter for {} (timeout {:?})", api_url, timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IngestionError::Config(e.to_string()))?;
        Ok(Self { client, api_url })
    }
}

#[async_trait]
impl BatchSubmitter for HttpBatchSubmitter {
    async fn submit(&self, payload: &serde_json::Value) -> Result<SubmissionResponse, IngestionError> {
        let response = self.client
            .post(&self.api_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send batch to {}: {}", self.api_url, e);
                IngestionError::Transport(e.to_string())
            })?;

        // The body carries the verdict whatever the HTTP status is.
        let status_code = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read response body from {}: {}", self.api_url, e);
            IngestionError::Transport(e.to_string())
        })?;
        debug!("Ingestion API answered {}: {}", status_code, body);

        serde_json::from_str(&body).map_err(|e| {
            error!("Ingestion API returned unparseable body (HTTP {}): {}", status_code, e);
            IngestionError::InvalidResponse(format!("HTTP {status_code}: {e}"))
        })
    }
}
