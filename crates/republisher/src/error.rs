//! Error types for the republisher pipeline
//!
//! Errors are split by how far they propagate:
//!
//! - [`BatchError`] (a malformed row or a [`TransportError`]) fails one window only;
//!   the dispatcher routes that window to the error sink and moves on.
//! - [`RepublishError`] ends the run: bad configuration, an unreadable source, or a
//!   failed write to the error sink.

use republisher_common::{CommonError, MalformedRowError};
use thiserror::Error;

use crate::report::RunReport;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, RepublishError>;

/// Fatal errors. Any of these stops the run.
#[derive(Error, Debug)]
pub enum RepublishError {
    /// Invalid batch size, timeout, or endpoint. Raised before any batch is sent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The CSV input could not be read
    #[error("Failed to read records: {0}")]
    Source(#[from] SourceError),

    /// The error sink rejected a write. Carries the counters accumulated so far.
    #[error("Error sink write failed after {} processed rows: {source}", .report.processed_rows)]
    SinkWrite {
        source: SinkError,
        report: Box<RunReport>,
    },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl RepublishError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// The partial report of an aborted run, if this error carries one
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            Self::SinkWrite { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Failure talking to the remote API
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-2xx status
    #[error("Server responded {status} {reason}")]
    Status { status: u16, reason: String },

    /// Connection failure, timeout, or broken body stream
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// 2xx response whose body is not the expected JSON
    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(String),

    #[error("Invalid authentication header: {0}")]
    Header(String),
}

impl TransportError {
    pub fn status(status: u16, reason: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Why a whole window failed
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    MalformedRow(#[from] MalformedRowError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Local write failure on the error sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reading the tabular input
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unparsable or ragged CSV
    #[error("Invalid CSV: {0}")]
    Format(csv::Error),
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return SourceError::Format(err);
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => SourceError::Io(io),
            kind => SourceError::Io(std::io::Error::other(format!("{:?}", kind))),
        }
    }
}
