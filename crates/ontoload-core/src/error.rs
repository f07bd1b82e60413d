//! Centralized error types for ingestion.

use thiserror::Error;

use crate::model::Characteristic;

/// Failure reported by a graph store adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Graph store unreachable: {0}")]
    Unavailable(String),

    #[error("Uniqueness constraint rejected write: {0}")]
    Conflict(String),

    #[error("Statement rejected by store: {0}")]
    Query(String),

    #[error("Transaction is already closed")]
    TransactionClosed,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Main error type for ingestion operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid label '{0}': expected a letter or '_' followed by letters, digits or '_'")]
    InvalidLabel(String),

    #[error("Invalid property key '{0}'")]
    InvalidProperty(String),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("{label} with id '{id}' already exists")]
    AlreadyExists { label: String, id: String },

    #[error("Endpoint {label} with id '{id}' does not exist")]
    EndpointMissing { label: String, id: String },

    #[error("{characteristic} constraint violated for {rel}: {detail}")]
    ConstraintViolated {
        rel: String,
        characteristic: Characteristic,
        detail: String,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Aborted: {0}")]
    Aborted(String),
}

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    /// Create an already-exists error.
    pub fn already_exists(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            label: label.into(),
            id: id.into(),
        }
    }

    /// Create an endpoint-missing error.
    pub fn endpoint_missing(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self::EndpointMissing {
            label: label.into(),
            id: id.into(),
        }
    }

    /// Create an aborted error.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Stable snake_case name of the error kind, used to group failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidLabel(_) => "invalid_label",
            Self::InvalidProperty(_) => "invalid_property",
            Self::MissingField(_) => "missing_field",
            Self::InvalidSource(_) => "invalid_source",
            Self::AlreadyExists { .. } => "already_exists",
            Self::EndpointMissing { .. } => "endpoint_missing",
            Self::ConstraintViolated { .. } => "constraint_violated",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Aborted(_) => "aborted",
        }
    }

    /// Transport-level failures are the caller's to retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            other => Self::Aborted(other.to_string()),
        }
    }
}
