//! Error types for the generation client.

use thiserror::Error;

use crate::types::ErrorBody;

/// Errors that can occur while requesting or streaming a generation.
///
/// `Display` renders the message shown to the user.
#[derive(Debug, Error)]
pub enum GenerationClientError {
    /// The request never reached the server
    #[error("Unable to reach the generation service. Please check your network connection and try again.")]
    Connectivity(#[source] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The backend sent an explicit error frame
    #[error("{0}")]
    Stream(String),

    /// The response body broke off while it was being read
    #[error("Connection lost while receiving the response: {0}")]
    Transport(String),

    /// Invalid configuration (bad endpoint URL, bad header value)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GenerationClientError {
    /// Classify a non-success response.
    ///
    /// An explicit `{"error": "..."}` message in the body wins over the status-based text.
    pub fn from_status(status: u16, body: &str) -> Self {
        let explicit = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());

        let message = explicit.unwrap_or_else(|| status_message(status));
        GenerationClientError::Status { status, message }
    }

    /// HTTP status, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GenerationClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-readable category, used in event payloads and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationClientError::Connectivity(_) => "connectivity",
            GenerationClientError::Status { .. } => "http_status",
            GenerationClientError::Stream(_) | GenerationClientError::Transport(_) => {
                "stream_protocol"
            }
            GenerationClientError::Config(_) => "config",
        }
    }
}

fn status_message(status: u16) -> String {
    match status {
        401 => "Invalid API key. Please check your API key in Settings.".to_string(),
        400 => "Bad request. Please try rephrasing your prompt.".to_string(),
        429 => "Rate limit exceeded. Please wait a moment and try again.".to_string(),
        s if s >= 500 => format!("Server error ({}). Please try again later.", s),
        s => format!("Request failed with status {}.", s),
    }
}
