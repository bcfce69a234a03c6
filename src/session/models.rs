//! Session data model.

use chrono::{DateTime, Utc};
use livegen_client::{HistoryMessage, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl From<ChatRole> for Role {
    fn from(role: ChatRole) -> Self {
        match role {
            ChatRole::User => Role::User,
            ChatRole::Assistant => Role::Assistant,
        }
    }
}

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Code snapshot produced by this message's turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            code: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            code: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == ChatRole::Assistant
    }
}

/// A code change recorded by a successful turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRevision {
    pub code: String,
    /// Prompt that produced the change
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

/// The active session: chat history plus the code it converged on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub current_code: String,
    #[serde(default)]
    pub chat: Vec<ChatMessage>,
    #[serde(default)]
    pub revisions: Vec<CodeRevision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(initial_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            current_code: initial_code.into(),
            chat: Vec::new(),
            revisions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The last `limit` chat messages in request form.
    pub fn history_context(&self, limit: usize) -> Vec<HistoryMessage> {
        let skip = self.chat.len().saturating_sub(limit);
        self.chat
            .iter()
            .skip(skip)
            .map(|m| HistoryMessage {
                role: m.role.into(),
                content: m.content.clone(),
            })
            .collect()
    }
}
