//! Error types, one enum per seam.
//!
//! Failures local to a single record are logged and the record is
//! skipped; failures tied to one request surface as a typed response
//! or task state. Nothing here is retried.

use thiserror::Error;

/// Registry mutation failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The mirrored store write/delete failed. Propagated, not retried.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// The skill document could not be serialized.
    #[error("skill document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of the external agent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("agent not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Failures of the remote transport. A transport failure is a single
/// terminal error, never a partial result.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(String),

    #[error("invalid response from agent: {0}")]
    InvalidResponse(String),
}

/// What a skill handler returns when invocation fails. The message
/// ends up in the task's `error` metadata verbatim.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Task lifecycle failures.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid message parameters: {0}")]
    InvalidMessage(String),
}
