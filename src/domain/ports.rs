use async_trait::async_trait;
use crate::domain::{error::IngestionError, models::{SubmissionResponse, Table}};

pub trait DataParser: Send + Sync {
    fn parse(&self, file_bytes: &[u8]) -> Result<Table, IngestionError>;
}

#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit(&self, payload: &serde_json::Value) -> Result<SubmissionResponse, IngestionError>;
}
