//! LLM request/response types for Route Roulette
//!
//! These types model the Gemini `generateContent` API closely enough to carry
//! grounding tools and thinking budgets, without leaking wire details into
//! the services.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier for this call
    pub model: String,

    /// System instruction (empty for none)
    pub system_prompt: String,

    /// Conversation turns, oldest first; the last one is the turn input
    pub messages: Vec<Message>,

    /// Grounding tools the model may use
    pub tools: Vec<GroundingTool>,

    /// Max answer tokens (capped by the client's configured maximum)
    pub max_tokens: u32,

    /// Thinking budget in tokens, if the call should think first
    ///
    /// Gemini counts thoughts against the output limit, so the budget is
    /// added on top of `max_tokens` on the wire.
    pub thinking_budget: Option<u32>,
}

impl CompletionRequest {
    /// Single-turn request with no system instruction, tools or thinking
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        let model = model.into();
        debug!(%model, %max_tokens, "CompletionRequest::prompt: called");
        Self {
            model,
            system_prompt: String::new(),
            messages: vec![Message::user(prompt)],
            tools: vec![],
            max_tokens,
            thinking_budget: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<GroundingTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name on the Gemini wire
    pub fn as_gemini(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// Search/maps augmentation the model may use while answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingTool {
    GoogleSearch,
    GoogleMaps,
}

impl GroundingTool {
    /// Convert to Gemini API tool format
    pub fn to_gemini_schema(&self) -> serde_json::Value {
        match self {
            GroundingTool::GoogleSearch => serde_json::json!({ "googleSearch": {} }),
            GroundingTool::GoogleMaps => serde_json::json!({ "googleMaps": {} }),
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why the model stopped
    pub stop_reason: StopReason,

    /// Token usage
    pub usage: TokenUsage,

    /// Web/maps sources the answer was grounded on
    pub citations: Vec<Citation>,
}

impl CompletionResponse {
    /// Plain text response with no citations
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
            citations: vec![],
        }
    }

    /// Content trimmed, or None when missing or blank
    pub fn trimmed_text(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// A grounding source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    Other(String),
}

impl StopReason {
    /// Parse from Gemini API finishReason string
    pub fn from_gemini(s: &str) -> Self {
        debug!(%s, "StopReason::from_gemini: called");
        match s {
            "STOP" => StopReason::EndTurn,
            "MAX_TOKENS" => StopReason::MaxTokens,
            "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => StopReason::Safety,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// Token usage as reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub thinking_tokens: u64,
}

/// Streaming chunk for live REPL output
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Text being generated
    TextDelta(String),

    /// Message complete with final stats
    MessageDone { stop_reason: StopReason, usage: TokenUsage },

    /// Error during streaming
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");

        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_role_as_gemini() {
        assert_eq!(Role::User.as_gemini(), "user");
        assert_eq!(Role::Assistant.as_gemini(), "model");
    }

    #[test]
    fn test_stop_reason_from_gemini() {
        assert_eq!(StopReason::from_gemini("STOP"), StopReason::EndTurn);
        assert_eq!(StopReason::from_gemini("MAX_TOKENS"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_gemini("SAFETY"), StopReason::Safety);
        assert_eq!(
            StopReason::from_gemini("RECITATION"),
            StopReason::Other("RECITATION".to_string())
        );
    }

    #[test]
    fn test_grounding_tool_schema() {
        assert!(GroundingTool::GoogleSearch.to_gemini_schema()["googleSearch"].is_object());
        assert!(GroundingTool::GoogleMaps.to_gemini_schema()["googleMaps"].is_object());
    }

    #[test]
    fn test_request_builders() {
        let req = CompletionRequest::prompt("gemini-2.5-flash", "Find a trail", 1024)
            .with_tools(vec![GroundingTool::GoogleSearch])
            .with_thinking_budget(512);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.tools, vec![GroundingTool::GoogleSearch]);
        assert_eq!(req.thinking_budget, Some(512));
        assert!(req.system_prompt.is_empty());
    }

    #[test]
    fn test_trimmed_text() {
        assert_eq!(CompletionResponse::text("  hi \n").trimmed_text(), Some("hi"));
        assert_eq!(CompletionResponse::text("   ").trimmed_text(), None);
    }
}
