use thiserror::Error;

/// Shown for every failure that is not an application-level rejection
pub const TRANSPORT_FAILURE: &str = "Failed to connect to backend.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, timeout, or body read failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// The backend answered, but with a non-success `status`
    #[error("backend rejected the request: {message}")]
    Rejected { message: String },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected { .. })
    }

    /// Text surfaced to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { message } => format!("Error: {}", message),
            _ => TRANSPORT_FAILURE.to_string(),
        }
    }

    /// The backend's own message for a rejection, otherwise the generic
    /// transport text. Unlike `user_message` it carries no `Error:` prefix.
    pub fn detail(&self) -> &str {
        match self {
            ApiError::Rejected { message } => message,
            _ => TRANSPORT_FAILURE,
        }
    }
}
