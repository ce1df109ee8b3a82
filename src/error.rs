//! Client error taxonomy.
//!
//! Every failure the controller can hit is a `ClientError`. The controller turns
//! each one into a user-visible notification; none of them are fatal to the UI.

use crate::model::{Action, View};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend error: HTTP {status}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },

    #[error("invalid inference response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("backend response did not include a session id")]
    MissingSessionId,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} already in progress")]
    Busy(Action),

    #[error("failed to read {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to export result to {}: {message}", .path.display())]
    Export { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request task failed: {0}")]
    Task(String),
}

/// Client-side checks that fail before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("supplementary text is empty")]
    EmptyText,

    #[error("no active session, upload a file first")]
    NoSession,

    #[error("{action} is not available while {view}")]
    NotAvailable { action: Action, view: View },

    #[error("nothing to go back from, already on the upload view")]
    NothingToReset,

    #[error("{name} is empty")]
    EmptyFile { name: String },

    #[error("{name} is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },
}

/// Coarse classification used for presentation and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Backend,
    Validation,
    Local,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Status { .. } | ClientError::Decode(_) | ClientError::MissingSessionId => {
                ErrorKind::Backend
            }
            ClientError::Validation(_) | ClientError::Busy(_) => ErrorKind::Validation,
            ClientError::ReadFile { .. }
            | ClientError::Export { .. }
            | ClientError::Config(_)
            | ClientError::Task(_) => ErrorKind::Local,
        }
    }

    /// HTTP status reported by the backend, if this is a backend-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
