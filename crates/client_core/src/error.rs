use std::fmt;

use shared::{
    error::{ErrorKind, ServiceErrorBody},
    protocol::ExportTarget,
};
use thiserror::Error;

/// Remote call that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Predict,
    Metrics,
    Segmentation,
    TopCustomers,
    Export(ExportTarget),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Predict => f.write_str("predict"),
            Operation::Metrics => f.write_str("metrics"),
            Operation::Segmentation => f.write_str("segmentation"),
            Operation::TopCustomers => f.write_str("top customers"),
            Operation::Export(target) => write!(f, "export {}", target.name()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceFailure {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("{}", .0.error)]
    Rejected(ServiceErrorBody),
    #[error("service returned no predictions")]
    EmptyPredictions,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no dataset selected")]
    NoFileSelected,
    #[error("{operation} request failed: {reason}")]
    ServiceUnavailable {
        operation: Operation,
        reason: ServiceFailure,
    },
    #[error("failed to write {} export: {source}", .target.name())]
    ExportWrite {
        target: ExportTarget,
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn unavailable(operation: Operation, reason: ServiceFailure) -> Self {
        Self::ServiceUnavailable { operation, reason }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NoFileSelected => ErrorKind::NoFileSelected,
            ClientError::ServiceUnavailable { .. } | ClientError::ExportWrite { .. } => {
                ErrorKind::ServiceUnavailable
            }
        }
    }
}
