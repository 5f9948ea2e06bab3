//! Guide chat about the current route

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::RouteServices;
use crate::domain::{ChatMessage, ChatRole, Preferences, Route};
use crate::llm::{CompletionRequest, CompletionResponse, LlmError, Message, StreamChunk};
use crate::prompts::{PromptContext, Template};

/// Reply used when the chat call fails
pub const CHAT_FALLBACK: &str = "I'm having trouble connecting to the ranger station. Try again?";

const CHAT_MAX_TOKENS: u32 = 2048;
const CHAT_THINKING_BUDGET: u32 = 1024;

impl RouteServices {
    /// Answer one user message about the route
    ///
    /// The conversation is rebuilt from `transcript` on every call; the new
    /// message is the turn input. Never fails.
    pub async fn reply(&self, transcript: &[ChatMessage], message: &str, route: &Route, prefs: &Preferences) -> String {
        self.reply_inner(transcript, message, route, prefs, None).await
    }

    /// Like [`RouteServices::reply`], forwarding text deltas as they arrive
    pub async fn reply_streaming(
        &self,
        transcript: &[ChatMessage],
        message: &str,
        route: &Route,
        prefs: &Preferences,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> String {
        self.reply_inner(transcript, message, route, prefs, Some(chunk_tx)).await
    }

    async fn reply_inner(
        &self,
        transcript: &[ChatMessage],
        message: &str,
        route: &Route,
        prefs: &Preferences,
        chunk_tx: Option<mpsc::Sender<StreamChunk>>,
    ) -> String {
        debug!(route_id = %route.id, history_len = transcript.len(), streaming = chunk_tx.is_some(), "reply: called");
        let request = match self.chat_request(transcript, message, route, prefs) {
            Some(r) => r,
            None => return CHAT_FALLBACK.to_string(),
        };

        let call = async {
            match chunk_tx {
                Some(tx) => self.llm.stream(request, tx).await,
                None => self.llm.complete(request).await,
            }
        };

        let result: Result<CompletionResponse, LlmError> = match tokio::time::timeout(self.aux_timeout, call).await {
            Ok(r) => r,
            Err(_) => Err(LlmError::Timeout(self.aux_timeout)),
        };

        match result {
            Ok(response) => match response.trimmed_text() {
                Some(text) => text.to_string(),
                None => {
                    warn!("Chat reply was empty, using fallback");
                    CHAT_FALLBACK.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Chat reply failed, using fallback");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    fn chat_request(
        &self,
        transcript: &[ChatMessage],
        message: &str,
        route: &Route,
        prefs: &Preferences,
    ) -> Option<CompletionRequest> {
        let system_prompt = match self.prompts.render(Template::Guide, &PromptContext::route(route, prefs)) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Guide prompt failed to render");
                return None;
            }
        };

        // A truncated transcript may open with an assistant turn; the API
        // wants the conversation to start with the user
        let mut messages: Vec<Message> = transcript
            .iter()
            .skip_while(|m| m.role == ChatRole::Assistant)
            .map(|m| match m.role {
                ChatRole::User => Message::user(&m.text),
                ChatRole::Assistant => Message::assistant(&m.text),
            })
            .collect();
        messages.push(Message::user(message));

        Some(CompletionRequest {
            model: self.models.chat.clone(),
            system_prompt,
            messages,
            tools: vec![],
            max_tokens: CHAT_MAX_TOKENS,
            thinking_budget: Some(CHAT_THINKING_BUDGET),
        })
    }
}
