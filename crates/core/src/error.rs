//! Error types for the Momenarr domain

use thiserror::Error;

/// Semantic error kind, used by stage-boundary handlers to decide whether to
/// log-and-continue, retry, or abort the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    DuplicateKey,
    Transient,
    Validation,
    Fatal,
}

#[derive(Error, Debug)]
pub enum MomenarrError {
    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("duplicate key: {resource}")]
    DuplicateKey { resource: String },

    #[error("no NZB found for trakt_id {trakt_id}")]
    NoNzbFound { trakt_id: i64 },

    #[error("transient error talking to {service}: {message}")]
    Transient { service: String, message: String },

    #[error("validation failed: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("configuration error: {field} - {message}")]
    Configuration { field: String, message: String },

    #[error("authentication required for {service}")]
    AuthenticationRequired { service: String },

    #[error("external service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("circuit breaker open for {service}")]
    CircuitBreakerOpen { service: String },

    #[error("{operation} timed out")]
    Timeout { operation: String },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<MomenarrError>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MomenarrError>;

impl MomenarrError {
    /// Map onto the five semantic kinds used by stage-boundary error policy (§7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            MomenarrError::NotFound { .. } | MomenarrError::NoNzbFound { .. } => ErrorKind::NotFound,
            MomenarrError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            MomenarrError::Transient { .. } | MomenarrError::ExternalService { .. } => {
                ErrorKind::Transient
            }
            MomenarrError::Validation { .. } | MomenarrError::ParseError { .. } => {
                ErrorKind::Validation
            }
            MomenarrError::Configuration { .. } | MomenarrError::AuthenticationRequired { .. } => {
                ErrorKind::Fatal
            }
            MomenarrError::Cancelled
            | MomenarrError::CircuitBreakerOpen { .. }
            | MomenarrError::Timeout { .. }
            | MomenarrError::RetryExhausted { .. } => ErrorKind::Transient,
            MomenarrError::Database(_) => ErrorKind::Transient,
            MomenarrError::Io(_) => ErrorKind::Transient,
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, MomenarrError::DuplicateKey { .. })
            || matches!(self, MomenarrError::Database(sqlx::Error::Database(e)) if e.is_unique_violation())
    }
}
