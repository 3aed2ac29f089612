//! Shared response body types for API handlers.

use serde::Serialize;

/// `{ "message": "..." }` acknowledgement for writes with nothing else to return.
///
/// ```ignore
/// Ok(Json(MessageResponse::new("All marked as read")))
/// ```
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{ "count": n }` body for counters.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}
