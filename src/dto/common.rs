use serde::Serialize;
use utoipa::ToSchema;

/// Generic action acknowledgement used by admin endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// What happened.
    pub message: String,
}

impl ActionResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Why the request failed.
    pub message: String,
}
