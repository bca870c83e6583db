use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("No file selected. Please select a CSV file.")]
    FileNotSelected,

    #[error("Invalid filename. Please select a valid CSV filename.")]
    InvalidFilename(String),

    #[error("Empty CSV file. Please upload a file with data.")]
    EmptyFile,

    #[error("Failed to parse CSV: {0}")]
    Parse(String),

    /// The upload itself could not be read; `status` is the HTTP status to answer with.
    #[error("{message}")]
    UploadRejected { status: u16, message: String },

    #[error("Invalid number of columns. Expected {expected} columns.")]
    InvalidColumnCount { expected: usize, found: usize },

    #[error("The data types of file '{filename}' were not expected. Details: {details}")]
    InvalidDtype { filename: String, details: String },

    #[error("The third column has invalid datetime values.")]
    InvalidDatetime,

    /// The ingestion API answered a batch with `status: "error"`.
    #[error("{message}")]
    RemoteSubmission {
        batch: usize,
        total: usize,
        message: String,
    },

    #[error("Request to ingestion API failed: {0}")]
    Transport(String),

    #[error("Unexpected response from ingestion API: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestionError {
    /// Name of the user-visible state this error puts the upload in.
    pub fn state(&self) -> &'static str {
        match self {
            IngestionError::FileNotSelected => "file_not_selected",
            IngestionError::InvalidFilename(_) => "invalid_filename",
            IngestionError::EmptyFile => "empty_file",
            IngestionError::Parse(_) => "parse_error",
            IngestionError::UploadRejected { status: 413, .. } => "upload_too_large",
            IngestionError::UploadRejected { .. } => "upload_error",
            IngestionError::InvalidColumnCount { .. } => "invalid_column_count",
            IngestionError::InvalidDtype { .. } => "invalid_dtypes",
            IngestionError::InvalidDatetime => "invalid_datetime",
            IngestionError::RemoteSubmission { .. } => "submission_error",
            IngestionError::Transport(_) => "transport_error",
            IngestionError::InvalidResponse(_) => "invalid_response",
            IngestionError::Config(_) => "config_error",
            IngestionError::Internal(_) => "internal_error",
        }
    }

    /// Whether the error was caused by the uploaded file rather than by a collaborator.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            IngestionError::RemoteSubmission { .. }
                | IngestionError::Transport(_)
                | IngestionError::InvalidResponse(_)
                | IngestionError::Config(_)
                | IngestionError::Internal(_)
        )
    }
}
