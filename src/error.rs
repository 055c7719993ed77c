use std::fmt;
use thiserror::Error;

/// Failure of one source call
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or timeout failure; the only retryable class
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Payload did not have the expected shape
    #[error("failed to parse payload: {0}")]
    Parse(String),

    /// Well-formed payload carrying impossible draw data
    #[error("invalid draw: {0}")]
    Validation(String),

    #[error("{source_name} exhausted after {attempts} attempts: {last}")]
    SourceExhausted {
        source_name: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transient(_) => ErrorKind::Transient,
            FetchError::UnexpectedStatus { .. } | FetchError::Parse(_) => ErrorKind::Parse,
            FetchError::Validation(_) => ErrorKind::Validation,
            FetchError::SourceExhausted { .. } => ErrorKind::SourceExhausted,
            FetchError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        FetchError::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        FetchError::Validation(msg.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        if e.is_decode() {
            return FetchError::Parse(e.to_string());
        }
        // connect, timeout, request and body errors
        FetchError::Transient(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Parse(e.to_string())
    }
}

/// Stable error code used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Parse,
    Validation,
    SourceExhausted,
    Cancelled,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::SourceExhausted => "source_exhausted",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
