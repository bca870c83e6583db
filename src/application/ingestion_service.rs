use std::sync::Arc;
use tracing::{info, debug, error, warn};
use uuid::Uuid;
use crate::domain::{
    batch::{build_payload, split_batches, Batch},
    error::IngestionError,
    models::{SubmissionReport, Table},
    ports::{BatchSubmitter, DataParser},
    validation,
};

pub const FILE_UPLOADED_MESSAGE: &str = "File uploaded successfully.";
pub const DTYPES_OK_MESSAGE: &str = "The data types of CSV are correct.";
pub const RENAMED_MESSAGE: &str = "The columns of DataFrame were renamed.";

/// A validated upload, ready to be sent batch by batch.
/// Payloads are shaped one batch at a time when they are needed.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub upload_id: Uuid,
    pub table_name: &'static str,
    pub table: Table,
    pub batch_size: usize,
    pub messages: Vec<&'static str>,
}

impl PreparedUpload {
    pub fn batches(&self) -> Vec<Batch<'_>> {
        split_batches(&self.table, self.batch_size)
    }

    pub fn batch_count(&self) -> usize {
        self.batches().len()
    }

    pub fn payloads(&self) -> impl Iterator<Item = serde_json::Value> + '_ {
        self.batches()
            .into_iter()
            .map(move |batch| build_payload(self.table_name, &batch))
    }
}

pub struct IngestionService {
    data_parser: Arc<dyn DataParser>,
    submitter: Arc<dyn BatchSubmitter>,
    batch_size: usize,
}

impl IngestionService {
    pub fn new(
        data_parser: Arc<dyn DataParser>,
        submitter: Arc<dyn BatchSubmitter>,
        batch_size: usize,
    ) -> Self {
        Self {
            data_parser,
            submitter,
            batch_size,
        }
    }

    pub fn prepare(&self, filename: &str, file_bytes: &[u8]) -> Result<PreparedUpload, IngestionError> {
        let upload_id = Uuid::new_v4();
        info!("Preparing upload {} ({}, {} bytes)", upload_id, filename, file_bytes.len());

        // Step 1: Filename
        let schema = validation::validate_filename(filename)?;
        let mut messages = vec![FILE_UPLOADED_MESSAGE];

        // Step 2: Parse headerless CSV
        debug!("Step 2: Parsing {}", filename);
        let mut table = self.data_parser.parse(file_bytes)
            .map_err(|e| {
                error!("Failed to parse {}: {}", filename, e);
                e
            })?;

        // Step 3: Column count
        debug!("Step 3: Checking column count of {}", filename);
        validation::validate_column_count(schema, &table)?;

        // Step 4: Dtypes
        debug!("Step 4: Checking column dtypes of {}", filename);
        validation::coerce_dtypes(schema, &mut table)?;
        messages.push(DTYPES_OK_MESSAGE);

        // Step 5: Datetime column
        debug!("Step 5: Checking datetime column of {}", filename);
        validation::validate_datetime_column(schema, &table)?;

        // Step 6: Rename
        validation::rename_columns(schema, &mut table);
        messages.push(RENAMED_MESSAGE);
        debug!("Renamed columns to {:?}", table.labels());

        let upload = PreparedUpload {
            upload_id,
            table_name: schema.table_name(),
            table,
            batch_size: self.batch_size,
            messages,
        };
        info!("✅ Upload {} validated: {} rows in {} batches for table {}",
            upload_id, upload.table.height(), upload.batch_count(), upload.table_name);

        Ok(upload)
    }

    /// Sends batches in order and stops at the first one the API reports as an error.
    pub async fn submit(&self, upload: &PreparedUpload) -> Result<SubmissionReport, IngestionError> {
        let total = upload.batch_count();
        info!("Submitting upload {}: {} batches for table {}", upload.upload_id, total, upload.table_name);

        let mut final_message = String::new();
        for (index, payload) in upload.payloads().enumerate() {
            let batch = index + 1;
            debug!("Submitting batch {} of {}", batch, total);

            let response = self.submitter.submit(&payload).await
                .map_err(|e| {
                    error!("Batch {} of {} for upload {} failed: {}", batch, total, upload.upload_id, e);
                    if index > 0 {
                        warn!("Upload {} partially submitted: {} of {} batches sent", upload.upload_id, index, total);
                    }
                    e
                })?;

            if response.is_error() {
                error!("Ingestion API rejected batch {} of {}: {}", batch, total, response.message);
                if index > 0 {
                    warn!("Upload {} partially submitted: {} of {} batches accepted", upload.upload_id, index, total);
                }
                return Err(IngestionError::RemoteSubmission {
                    batch,
                    total,
                    message: response.message,
                });
            }
            final_message = response.message;
        }

        info!("✅ Upload {} submitted: {} batches", upload.upload_id, total);
        Ok(SubmissionReport {
            message: final_message,
            batches_submitted: total,
            batches_total: total,
        })
    }

    pub async fn process_upload(&self, filename: &str, file_bytes: &[u8]) -> Result<SubmissionReport, IngestionError> {
        let upload = self.prepare(filename, file_bytes)?;
        self.submit(&upload).await
    }
}
