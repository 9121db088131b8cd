use crate::session::AnalysisTask;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Local precondition failures. These never reach the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no document selected")]
    NoDocument,
    #[error("a non-empty question is required for question answering")]
    EmptyQuestion,
    #[error("a {0} request is already in flight")]
    InFlight(AnalysisTask),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("response body is not valid JSON: {0}")]
    Decode(String),
    #[error("could not build request: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("expected a JSON object in the {task} response, got {found}")]
    NotAnObject {
        task: AnalysisTask,
        found: &'static str,
    },
    #[error("field `{field}` in the {task} response has type {found}")]
    FieldType {
        task: AnalysisTask,
        field: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Normalization,
}

/// What a failed task keeps until its next submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&TransportError> for ErrorInfo {
    fn from(err: &TransportError) -> Self {
        let kind = match err {
            TransportError::Decode(_) => ErrorKind::Normalization,
            _ => ErrorKind::Transport,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<&NormalizationError> for ErrorInfo {
    fn from(err: &NormalizationError) -> Self {
        Self {
            kind: ErrorKind::Normalization,
            message: err.to_string(),
        }
    }
}
