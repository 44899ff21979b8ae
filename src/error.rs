//! Error types for every user action.
//!
//! Each concern gets its own enum so callers can match on the failure they
//! care about. None of these are fatal: the web layer and the CLI turn them
//! into a message and the session stays usable.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading the lookup dataset.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The dataset file does not exist.
    #[error("lookup file not found: {path}")]
    NotFound { path: PathBuf },

    /// The dataset is not valid UTF-8.
    #[error("lookup file {path} is not valid UTF-8 (record {record})")]
    Decode { path: PathBuf, record: u64 },

    /// A configured column header is absent from the dataset.
    #[error("lookup file {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    /// Any other read or parse failure.
    #[error("failed to read lookup file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Failures of the order session commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("line item {index} does not exist ({len} pending)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    #[error("{0}")]
    Validation(String),
}

/// Failures while serializing or persisting an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "web")]
    #[error("failed to encode XLSX: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Failures while delivering an export by email.
#[derive(Debug, Error)]
pub enum MailError {
    /// The relay rejected the configured credentials.
    #[error("mail relay rejected the credentials: {0}")]
    Auth(String),

    /// The relay could not be reached or the TLS handshake failed.
    #[error("could not connect to mail relay: {0}")]
    Connect(String),

    /// The connection was up but the message was not accepted.
    #[error("failed to send email: {0}")]
    Send(String),

    #[error("invalid email address '{0}'")]
    Address(String),
}

/// Failures while storing uploaded files.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload file name '{0}'")]
    InvalidName(String),

    /// The request body ended early or was not valid multipart.
    #[cfg(feature = "web")]
    #[error("failed to read upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure a user action can surface.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// An action that needs the mail relay was used without one configured.
    #[error("mail relay is not configured")]
    MailNotConfigured,
}
