//! Error body returned by every failing endpoint.

use serde::{Deserialize, Serialize};

/// `{message, data?}` error body.
///
/// `data` lists the offending fields for validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<FieldErrorBody>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Vec<FieldErrorBody>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn internal_error() -> Self {
        Self::new("An internal error occurred.")
    }
}
