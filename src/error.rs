//! Error types for payload shaping, transport and state persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or unexpectedly shaped input.
///
/// Always recoverable: the caller surfaces it with the offending path or value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} at {path}, got {actual}")]
    UnexpectedShape {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid value for string list at {path}: {raw}")]
    InvalidStringList { path: String, raw: String },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Shape mismatch at the document root.
    pub(crate) fn not_object(actual: &'static str) -> Self {
        DecodeError::UnexpectedShape {
            path: "(root)".to_string(),
            expected: "object",
            actual,
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            DecodeError::FileNotFound { .. } | DecodeError::ReadError { .. } => 3,
            DecodeError::Element { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

/// Internal bug detected while shaping a payload. Never corrected silently.
#[derive(Debug, Error)]
#[error("invariant violated in {operation}: {message}")]
pub struct InvariantViolation {
    pub operation: &'static str,
    pub message: String,
}

/// Errors raised by the HTTP collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    #[cfg(feature = "remote")]
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("response from {path} is not valid JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    #[error("invalid client configuration: {message}")]
    Config { message: String },
}

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Any failure of a shaping or lifecycle call.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("response for {kind} carries no \"id\"")]
    MissingId { kind: &'static str },

    #[error("no stored state for {kind} {id}")]
    UnknownResource { kind: &'static str, id: String },
}

impl PayloadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PayloadError::Decode(e) => e.exit_code(),
            PayloadError::Invariant(_) => 70,
            PayloadError::Transport(_) | PayloadError::Store(_) => 3,
            PayloadError::MissingId { .. } => 3,
            PayloadError::UnknownResource { .. } => 2,
        }
    }
}
