//! Request and frame types for the generation API.

use serde::{Deserialize, Serialize};

/// Marker that precedes every event payload on the wire.
pub const DATA_PREFIX: &str = "data: ";

/// Sentinel payload that terminates a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Status text the backend sends while it has nothing better to say.
pub const PLACEHOLDER_STATUS: &str = "generating...";

/// Number of chat messages sent along as context.
pub const CHAT_CONTEXT_LIMIT: usize = 10;

/// Whether the model writes code from scratch or edits the code already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    New,
    Edit,
}

impl Mode {
    /// `Edit` iff `current_code` is non-empty and differs from `default_code`.
    pub fn derive(current_code: &str, default_code: &str) -> Self {
        let trimmed = current_code.trim();
        if trimmed.is_empty() || trimmed == default_code.trim() {
            Mode::New
        } else {
            Mode::Edit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::New => "new",
            Mode::Edit => "edit",
        }
    }
}

/// Role of a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A chat history entry as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for the generation endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub mode: Mode,
    /// Only present in edit mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_code: Option<String>,
    pub chat_history: Vec<HistoryMessage>,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl GenerationRequest {
    /// Build a request. `prior_code` is dropped unless `mode` is `Edit`, and only the
    /// last [`CHAT_CONTEXT_LIMIT`] history entries are kept.
    pub fn new(
        prompt: impl Into<String>,
        mode: Mode,
        prior_code: Option<String>,
        history: Vec<HistoryMessage>,
        session_id: impl Into<String>,
    ) -> Self {
        let skip = history.len().saturating_sub(CHAT_CONTEXT_LIMIT);
        Self {
            prompt: prompt.into(),
            mode,
            current_code: match mode {
                Mode::Edit => prior_code,
                Mode::New => None,
            },
            chat_history: history.into_iter().skip(skip).collect(),
            session_id: session_id.into(),
            model: None,
            api_key: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model.filter(|m| !m.is_empty());
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

/// A decoded event from the response stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Frame {
    /// Text to append to the accumulated response
    ContentDelta {
        #[serde(default)]
        content: String,
    },
    /// Transient progress message
    Status {
        #[serde(default)]
        message: String,
    },
    /// Backend restarted generation; discard what was accumulated
    Clear,
    /// Backend gave up; abort the turn
    Error {
        #[serde(default)]
        error: String,
    },
    /// Anything with a `type` we do not know about
    #[serde(other)]
    Unknown,
}

/// Error body returned with a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}
