use std::sync::Arc;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, error, debug, warn};
use crate::{
    application::ingestion_service::{IngestionService, PreparedUpload},
    config::AppConfig,
    domain::{error::IngestionError, schema},
    infrastructure::{http::submitter::HttpBatchSubmitter, parsers::csv_parser::CsvParser},
};

pub const PATH_FORM: &str = "/";
pub const PATH_HEALTH: &str = "/health";
pub const PATH_VALIDATE: &str = "/validate";
pub const PATH_INGEST: &str = "/ingest";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IngestionService>,
    pub preview_rows: usize,
}

pub struct WebService {
    router: Router,
    bind_address: String,
}

impl WebService {
    pub fn new(config: &AppConfig) -> Result<Self, IngestionError> {
        debug!("Initializing web service");
        info!("Using ingestion API: {}", config.ingestion.api_url);

        let submitter = Arc::new(HttpBatchSubmitter::new(
            config.ingestion.api_url.clone(),
            config.ingestion.timeout(),
        )?);
        let service = IngestionService::new(Arc::new(CsvParser), submitter, config.ingestion.batch_size);
        let state = AppState {
            service: Arc::new(service),
            preview_rows: config.ingestion.preview_rows,
        };

        Ok(Self {
            router: router(state, config.server.upload_limit_bytes),
            bind_address: config.bind_address(),
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await
            .map_err(|e| {
                error!("Failed to bind {}: {}", self.bind_address, e);
                e
            })?;
        info!("Listening on http://{}", self.bind_address);
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn router(state: AppState, upload_limit_bytes: usize) -> Router {
    Router::new()
        .route(PATH_FORM, get(form_handler))
        .route(PATH_HEALTH, get(health_handler))
        .route(PATH_VALIDATE, post(validate_handler))
        .route(PATH_INGEST, post(ingest_handler))
        .layer(DefaultBodyLimit::max(upload_limit_bytes))
        .with_state(state)
}

/// Error response: `{"state", "message"}` plus batch counts for submission failures.
pub struct ApiError(pub IngestionError);

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IngestionError::FileNotSelected
            | IngestionError::InvalidFilename(_)
            | IngestionError::EmptyFile
            | IngestionError::Parse(_) => StatusCode::BAD_REQUEST,
            IngestionError::InvalidColumnCount { .. }
            | IngestionError::InvalidDtype { .. }
            | IngestionError::InvalidDatetime => StatusCode::UNPROCESSABLE_ENTITY,
            IngestionError::RemoteSubmission { .. }
            | IngestionError::Transport(_)
            | IngestionError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            IngestionError::UploadRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            IngestionError::Config(_) | IngestionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut body = json!({
            "state": self.0.state(),
            "message": self.0.to_string(),
        });
        if let IngestionError::RemoteSubmission { batch, total, .. } = &self.0 {
            body["batches_submitted"] = json!(batch);
            body["batches_total"] = json!(total);
        }
        (status, Json(body)).into_response()
    }
}

async fn form_handler() -> Html<String> {
    let filenames: String = schema::valid_filenames()
        .map(|name| format!("<li><code>{name}</code></li>"))
        .collect();
    Html(format!(
        r#"<!doctype html>
<html>
<head><title>Upload CSV</title></head>
<body>
<h1>Upload CSV and insert into the ingestion API</h1>
<p>Valid CSV filenames:</p>
<ul>{filenames}</ul>
<form method="post" enctype="multipart/form-data" action="{PATH_VALIDATE}">
<input type="file" name="file" accept=".csv">
<button type="submit" formaction="{PATH_VALIDATE}">Validate</button>
<button type="submit" formaction="{PATH_INGEST}">Insert</button>
</form>
</body>
</html>"#
    ))
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn validate_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await.map_err(log_failure)?;
    let upload = prepare_upload(&state, filename, bytes).await.map_err(log_failure)?;

    Ok(Json(json!({
        "state": "validated",
        "messages": upload.messages,
        "table_name": upload.table_name,
        "columns": upload.table.labels(),
        "row_count": upload.table.height(),
        "batch_count": upload.batch_count(),
        "preview": upload.table.head(state.preview_rows),
    })))
}

async fn ingest_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await.map_err(log_failure)?;
    let upload = prepare_upload(&state, filename, bytes).await.map_err(log_failure)?;
    let report = state.service.submit(&upload).await.map_err(log_failure)?;

    Ok(Json(json!({
        "state": "submission_success",
        "message": report.message,
        "batches_submitted": report.batches_submitted,
        "batches_total": report.batches_total,
    })))
}

fn log_failure(err: IngestionError) -> IngestionError {
    if err.is_rejection() {
        warn!("Upload rejected ({}): {}", err.state(), err);
    } else {
        error!("Upload failed ({}): {}", err.state(), err);
    }
    err
}

/// Runs parsing and validation on the blocking pool.
async fn prepare_upload(
    state: &AppState,
    filename: String,
    bytes: Vec<u8>,
) -> Result<PreparedUpload, IngestionError> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.prepare(&filename, &bytes))
        .await
        .map_err(|e| IngestionError::Internal(format!("validation task failed: {e}")))?
}

fn upload_error(e: MultipartError) -> IngestionError {
    let status = e.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "File too large. Please upload a smaller CSV file.".to_string()
    } else {
        format!("Failed to read upload: {}", e.body_text())
    };
    IngestionError::UploadRejected {
        status: status.as_u16(),
        message,
    }
}

/// Pulls the `file` field out of the form. A field without a filename counts as no file.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), IngestionError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(IngestionError::FileNotSelected),
        };
        let bytes = field.bytes().await.map_err(upload_error)?;
        debug!("Received {} ({} bytes)", filename, bytes.len());
        return Ok((filename, bytes.to_vec()));
    }
    Err(IngestionError::FileNotSelected)
}
