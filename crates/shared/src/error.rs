use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoFileSelected,
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::NoFileSelected => "Please select a file first",
            ErrorKind::ServiceUnavailable => {
                "Prediction service request failed. Make sure the API is running."
            }
        }
    }
}

/// Error envelope the service returns instead of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("service rejected request: {error}")]
pub struct ServiceErrorBody {
    pub error: String,
}
