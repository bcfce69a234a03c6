use livegen_client::GenerationClientError;
use serde::Serialize;
use thiserror::Error;

use crate::engine::EngineError;

pub const EMPTY_RESPONSE_MESSAGE: &str =
    "Empty response from AI. The model may be overloaded - please try again.";

/// Failure of a generation turn. `Display` is the user-facing message.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0}")]
    Client(#[from] GenerationClientError),

    #[error("{}", EMPTY_RESPONSE_MESSAGE)]
    EmptyResponse,

    #[error("{message}")]
    Extraction { message: String, raw_response: String },

    /// The code was committed but the engine rejected it
    #[error("{0}")]
    Runtime(EngineError),
}

impl TurnError {
    /// Machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            TurnError::Client(e) => e.kind(),
            TurnError::EmptyResponse => "empty_response",
            TurnError::Extraction { .. } => "extraction",
            TurnError::Runtime(_) => "runtime",
        }
    }

    /// Raw model output kept for diagnostics.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            TurnError::Extraction { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Errors whose diagnostics stay visible until dismissed.
    pub fn is_execution_class(&self) -> bool {
        matches!(self, TurnError::Extraction { .. } | TurnError::Runtime(_))
    }
}

impl Serialize for TurnError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TurnError>;
