//! Model-backed services
//!
//! Route discovery, tagline, deep-dive analysis and the guide chat. Only
//! route discovery can fail; every other call masks its failure with a fixed
//! fallback string.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::{Config, ModelsConfig};
use crate::llm::{LlmClient, LlmError};
use crate::prompts::PromptLoader;

mod chat;
mod deep_dive;
mod recommend;

pub use chat::CHAT_FALLBACK;
pub use deep_dive::{ANALYSIS_EMPTY_FALLBACK, ANALYSIS_FALLBACK};
pub use recommend::{TAGLINE_EMPTY_FALLBACK, TAGLINE_FALLBACK, strip_json_fence};

/// Route discovery failed; the spin is over
#[derive(Debug, Error)]
pub enum RequestFailure {
    #[error("Failed to scout a route: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to scout a route: no answer after {0:?}")]
    Timeout(Duration),

    #[error("Failed to scout a route: the model returned no text")]
    EmptyResponse,

    #[error("Failed to scout a route: could not parse the recommendation ({0})")]
    Parse(String),

    #[error("Failed to scout a route: {0}")]
    Prompt(String),
}

/// Everything the services need to talk to the model
pub struct RouteServices {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    models: ModelsConfig,
    thinking_budget: u32,
    route_timeout: Duration,
    aux_timeout: Duration,
}

impl RouteServices {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader, config: &Config) -> Self {
        debug!("RouteServices::new: called");
        Self {
            llm,
            prompts,
            models: config.llm.models.clone(),
            thinking_budget: config.llm.thinking_budget,
            route_timeout: config.session.route_timeout(),
            aux_timeout: config.session.aux_timeout(),
        }
    }

    /// Override both timeouts (tests use short ones)
    pub fn with_timeouts(mut self, route_timeout: Duration, aux_timeout: Duration) -> Self {
        self.route_timeout = route_timeout;
        self.aux_timeout = aux_timeout;
        self
    }
}
