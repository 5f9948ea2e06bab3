//! Google Gemini API client implementation
//!
//! Implements the LlmClient trait for the Gemini `generateContent` REST API
//! with support for both blocking and streaming (SSE) responses.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Citation, CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, StreamChunk, TokenUsage};
use crate::config::LlmConfig;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Turn a 429 response into a RateLimited error, honouring any retry hint
async fn rate_limit_error(response: reqwest::Response) -> LlmError {
    let header = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    LlmError::rate_limited(header, &body)
}

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    max_retries: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(base_url = %config.base_url, timeout_ms = %config.timeout_ms, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            timeout,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(model = %request.model, %request.max_tokens, "build_request_body: called");
        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_gemini(),
                    "parts": [{ "text": msg.content }],
                })
            })
            .collect();

        let answer_tokens = request.max_tokens.min(self.max_tokens);
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": answer_tokens + request.thinking_budget.unwrap_or(0),
        });
        if let Some(budget) = request.thinking_budget {
            debug!(%budget, "build_request_body: adding thinking budget");
            generation_config["thinkingConfig"] = serde_json::json!({ "thinkingBudget": budget });
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if !request.system_prompt.trim().is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": request.system_prompt }],
            });
        }

        if !request.tools.is_empty() {
            debug!(tool_count = %request.tools.len(), "build_request_body: adding grounding tools");
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_gemini_schema()).collect::<Vec<_>>());
        }

        body
    }

    /// Parse the Gemini API response
    fn parse_response(&self, api_response: GeminiResponse) -> Result<CompletionResponse, LlmError> {
        debug!(candidate_count = %api_response.candidates.len(), "parse_response: called");
        let usage = api_response.usage_metadata.map(TokenUsage::from).unwrap_or_default();

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            debug!(%reason, "parse_response: no candidates");
            return Err(LlmError::Blocked(reason));
        };

        let text = candidate.text();
        let stop_reason = candidate
            .finish_reason
            .as_deref()
            .map(StopReason::from_gemini)
            .unwrap_or(StopReason::EndTurn);
        let citations = candidate.citations();

        Ok(CompletionResponse {
            content: if text.is_empty() { None } else { Some(text) },
            stop_reason,
            usage,
            citations,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, %request.max_tokens, "complete: called");
        let url = self.endpoint(&request.model, "generateContent");
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(
                    attempt,
                    backoff_ms = backoff,
                    "complete: retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("x-goog-api-key", self.api_key.clone())
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(if e.is_timeout() {
                        LlmError::Timeout(self.timeout)
                    } else {
                        LlmError::Network(e)
                    });
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                debug!("complete: rate limited (429)");
                return Err(rate_limit_error(response).await);
            }

            if is_retryable_status(status) && attempt < self.max_retries {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::from_api_response(status, &text));
                continue;
            }

            if !response.status().is_success() {
                debug!(%status, "complete: API error");
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::from_api_response(status, &text));
            }

            debug!("complete: success");
            let api_response: GeminiResponse = response.json().await?;
            return self.parse_response(api_response);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    async fn stream(
        &self,
        request: CompletionRequest,
        chunk_tx: mpsc::Sender<StreamChunk>,
    ) -> Result<CompletionResponse, LlmError> {
        debug!(model = %request.model, %request.max_tokens, "stream: called");
        let url = format!("{}?alt=sse", self.endpoint(&request.model, "streamGenerateContent"));
        let body = self.build_request_body(&request);

        let http_request = self
            .http
            .post(url)
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(http_request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut full_content = String::new();
        let mut stop_reason = StopReason::EndTurn;
        let mut usage = TokenUsage::default();
        let mut citations = Vec::new();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("stream: Event::Open");
                }
                Ok(Event::Message(msg)) => {
                    let chunk: GeminiResponse = serde_json::from_str(&msg.data).map_err(LlmError::Json)?;
                    if let Some(u) = chunk.usage_metadata {
                        usage = TokenUsage::from(u);
                    }
                    if let Some(candidate) = chunk.candidates.into_iter().next() {
                        let text = candidate.text();
                        if !text.is_empty() {
                            full_content.push_str(&text);
                            let _ = chunk_tx.send(StreamChunk::TextDelta(text)).await;
                        }
                        citations.extend(candidate.citations());
                        if let Some(reason) = candidate.finish_reason.as_deref() {
                            debug!(%reason, "stream: finish reason");
                            stop_reason = StopReason::from_gemini(reason);
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("stream: stream ended");
                    break;
                }
                Err(reqwest_eventsource::Error::InvalidStatusCode(code, response)) => {
                    debug!(%code, "stream: API error");
                    es.close();
                    let status = code.as_u16();
                    let err = if status == 429 {
                        rate_limit_error(response).await
                    } else {
                        let text = response.text().await.unwrap_or_default();
                        LlmError::from_api_response(status, &text)
                    };
                    let _ = chunk_tx.send(StreamChunk::Error(err.to_string())).await;
                    return Err(err);
                }
                Err(e) => {
                    debug!(%e, "stream: Event error");
                    es.close();
                    let _ = chunk_tx.send(StreamChunk::Error(e.to_string())).await;
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }
        es.close();

        debug!(content_len = full_content.len(), "stream: complete");
        let _ = chunk_tx
            .send(StreamChunk::MessageDone {
                stop_reason: stop_reason.clone(),
                usage: usage.clone(),
            })
            .await;

        Ok(CompletionResponse {
            content: if full_content.is_empty() { None } else { Some(full_content) },
            stop_reason,
            usage,
            citations,
        })
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

impl GeminiCandidate {
    /// Concatenated answer text, skipping thought parts
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn citations(&self) -> Vec<Citation> {
        self.grounding_metadata
            .as_ref()
            .map(|g| {
                g.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref().or(chunk.maps.as_ref()))
                    .filter_map(|source| {
                        source.uri.as_ref().map(|uri| Citation {
                            title: source.title.clone().unwrap_or_else(|| uri.clone()),
                            uri: uri.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    web: Option<GeminiSource>,
    maps: Option<GeminiSource>,
}

#[derive(Debug, Deserialize)]
struct GeminiSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
}

impl From<GeminiUsage> for TokenUsage {
    fn from(u: GeminiUsage) -> Self {
        TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            thinking_tokens: u.thoughts_token_count,
        }
    }
}
