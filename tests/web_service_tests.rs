use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use csv_ingestion::{
    application::ingestion_service::IngestionService,
    domain::{error::IngestionError, models::SubmissionResponse, ports::BatchSubmitter},
    infrastructure::parsers::csv_parser::CsvParser,
    web_service::{router, AppState, PATH_FORM, PATH_HEALTH, PATH_INGEST, PATH_VALIDATE},
};
use serde_json::Value;
use tower::util::ServiceExt;

/// Accepts every batch except the `fail_on`-th one.
struct RecordingSubmitter {
    fail_on: Option<usize>,
    calls: Mutex<usize>,
}

#[async_trait]
impl BatchSubmitter for RecordingSubmitter {
    async fn submit(&self, _payload: &Value) -> Result<SubmissionResponse, IngestionError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        let (status, message) = if Some(*calls) == self.fail_on {
            ("error", format!("batch {} rejected", *calls))
        } else {
            ("ok", format!("batch {} inserted", *calls))
        };
        Ok(SubmissionResponse {
            status: status.to_string(),
            message,
        })
    }
}

fn test_app(fail_on: Option<usize>) -> (Router, Arc<RecordingSubmitter>) {
    test_app_with_limit(fail_on, 10 * 1024 * 1024)
}

fn test_app_with_limit(fail_on: Option<usize>, upload_limit_bytes: usize) -> (Router, Arc<RecordingSubmitter>) {
    let submitter = Arc::new(RecordingSubmitter {
        fail_on,
        calls: Mutex::new(0),
    });
    let service = IngestionService::new(Arc::new(CsvParser), submitter.clone(), 1000);
    let state = AppState {
        service: Arc::new(service),
        preview_rows: 3,
    };
    (router(state, upload_limit_bytes), submitter)
}

fn create_multipart_body(filename: Option<&str>, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary1234567890";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n", name)
                .as_bytes(),
        ),
        None => body.extend_from_slice(b"Content-Disposition: form-data; name=\"other\"\r\n"),
    }
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (boundary.to_string(), body)
}

async fn upload(app: Router, path: &str, filename: Option<&str>, content: &[u8]) -> (StatusCode, Value) {
    let (boundary, body) = create_multipart_body(filename, content);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", format!("multipart/form-data; boundary={}", boundary))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn hired_employees_csv(rows: usize) -> Vec<u8> {
    (1..=rows)
        .map(|i| {
            if i % 10 == 0 {
                format!("{i},Employee {i},2021-07-27T16:02:08Z,,{}\n", i % 180)
            } else {
                format!("{i},Employee {i},2021-07-27T16:02:08Z,{},{}\n", i % 12, i % 180)
            }
        })
        .collect::<String>()
        .into_bytes()
}

#[tokio::test]
async fn form_lists_valid_filenames() {
    let (app, _) = test_app(None);
    let response = app
        .oneshot(Request::builder().uri(PATH_FORM).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    for name in ["hired_employees.csv", "departments.csv", "jobs.csv"] {
        assert!(html.contains(name));
    }
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = test_app(None);
    let response = app
        .oneshot(Request::builder().uri(PATH_HEALTH).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn validate_renames_and_previews_hired_employees() {
    let (app, submitter) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, Some("hired_employees.csv"), &hired_employees_csv(20)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "validated");
    assert_eq!(json["table_name"], "hired_employees");
    assert_eq!(
        json["columns"],
        serde_json::json!(["id", "name", "datetime", "department_id", "job_id"])
    );
    assert_eq!(json["row_count"], 20);
    assert_eq!(json["batch_count"], 1);
    assert_eq!(json["preview"].as_array().unwrap().len(), 3);
    assert_eq!(json["preview"][0]["name"], "Employee 1");
    assert_eq!(*submitter.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn validate_accepts_departments_and_jobs() {
    for (filename, second) in [("departments.csv", "department"), ("jobs.csv", "job")] {
        let (app, _) = test_app(None);
        let (status, json) = upload(app, PATH_VALIDATE, Some(filename), b"1,Alpha\n2,Beta\n").await;
        assert_eq!(status, StatusCode::OK, "{filename}");
        assert_eq!(json["columns"], serde_json::json!(["id", second]));
    }
}

#[tokio::test]
async fn missing_file_field_is_file_not_selected() {
    let (app, _) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, None, b"1,a\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["state"], "file_not_selected");
}

#[tokio::test]
async fn unknown_filename_is_rejected() {
    let (app, _) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, Some("employees.csv"), b"1,a\n").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["state"], "invalid_filename");
    assert_eq!(json["message"], "Invalid filename. Please select a valid CSV filename.");
}

#[tokio::test]
async fn empty_file_is_rejected() {
    let (app, _) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, Some("jobs.csv"), b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["state"], "empty_file");
}

#[tokio::test]
async fn wrong_column_count_is_rejected() {
    let (app, _) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, Some("hired_employees.csv"), b"1,a\n").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["state"], "invalid_column_count");
    assert_eq!(json["message"], "Invalid number of columns. Expected 5 columns.");
}

#[tokio::test]
async fn text_in_id_column_is_invalid_dtype() {
    let (app, _) = test_app(None);
    let (status, json) = upload(app, PATH_VALIDATE, Some("jobs.csv"), b"1,a\nx,b\n").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["state"], "invalid_dtypes");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("The data types of file 'jobs.csv' were not expected."));
}

#[tokio::test]
async fn bad_datetime_is_rejected_even_with_valid_columns() {
    let (app, _) = test_app(None);
    let csv = b"1,Ana,2021-07-27T16:02:08Z,2,96\n2,Bob,not-a-date,3,97\n";
    let (status, json) = upload(app, PATH_VALIDATE, Some("hired_employees.csv"), csv).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["state"], "invalid_datetime");
    assert_eq!(json["message"], "The third column has invalid datetime values.");
}

#[tokio::test]
async fn ingest_reports_last_batch_message() {
    let (app, submitter) = test_app(None);
    let (status, json) = upload(app, PATH_INGEST, Some("hired_employees.csv"), &hired_employees_csv(2500)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "submission_success");
    assert_eq!(json["message"], "batch 3 inserted");
    assert_eq!(json["batches_total"], 3);
    assert_eq!(*submitter.calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn ingest_stops_at_rejected_batch() {
    let (app, submitter) = test_app(Some(2));
    let (status, json) = upload(app, PATH_INGEST, Some("hired_employees.csv"), &hired_employees_csv(2500)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["state"], "submission_error");
    assert_eq!(json["message"], "batch 2 rejected");
    assert_eq!(json["batches_submitted"], 2);
    assert_eq!(json["batches_total"], 3);
    assert_eq!(*submitter.calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn invalid_upload_is_never_submitted() {
    let (app, submitter) = test_app(None);
    let (status, _) = upload(app, PATH_INGEST, Some("jobs.csv"), b"1,a,extra\n").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(*submitter.calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn upload_over_body_limit_is_payload_too_large() {
    let (app, submitter) = test_app_with_limit(None, 64);
    let content: Vec<u8> = b"1,Recruiter\n".iter().copied().cycle().take(4096).collect();
    let (status, body) = upload(app, PATH_VALIDATE, Some("jobs.csv"), &content).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["state"], "upload_too_large");
    assert!(!body["message"].as_str().unwrap().contains("Failed to parse CSV"));
    assert_eq!(*submitter.calls.lock().unwrap(), 0);
}
