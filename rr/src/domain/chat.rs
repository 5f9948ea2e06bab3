//! Chat transcript types

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the guide chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Reserved for a "thinking" placeholder; nothing sets it yet
    #[serde(default)]
    pub thinking: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            thinking: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            thinking: false,
        }
    }
}

/// Append-only chat transcript with a size cap
///
/// When the cap is exceeded the oldest messages are dropped first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    limit: usize,
}

impl Transcript {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            limit: limit.max(2),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            debug!(%excess, limit = %self.limit, "Transcript::push: truncating oldest messages");
            self.messages.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
