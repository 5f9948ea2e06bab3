//! Deep-dive safety and suitability analysis

use tracing::{debug, info, warn};

use super::RouteServices;
use crate::domain::{Preferences, Route};
use crate::llm::CompletionRequest;
use crate::prompts::{PromptContext, Template};

/// Analysis text used when the call fails
pub const ANALYSIS_FALLBACK: &str = "Deep dive analysis currently unavailable.";

/// Analysis text used when the model answers with nothing
pub const ANALYSIS_EMPTY_FALLBACK: &str = "Could not generate analysis.";

const ANALYSIS_MAX_TOKENS: u32 = 8192;

impl RouteServices {
    /// Longer-form analysis of how well the route suits this user
    ///
    /// Never fails. Calls are independent, so asking twice simply asks twice.
    pub async fn analyze(&self, route: &Route, prefs: &Preferences) -> String {
        debug!(route_id = %route.id, experience = %prefs.experience, "analyze: called");
        let prompt = match self.prompts.render(Template::DeepDive, &PromptContext::route(route, prefs)) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Deep dive prompt failed to render, using fallback");
                return ANALYSIS_FALLBACK.to_string();
            }
        };
        let request = CompletionRequest::prompt(&self.models.analysis, prompt, ANALYSIS_MAX_TOKENS)
            .with_thinking_budget(self.thinking_budget);

        match tokio::time::timeout(self.aux_timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => match response.content {
                Some(text) if !text.trim().is_empty() => {
                    info!(route_id = %route.id, thinking_tokens = response.usage.thinking_tokens, "Deep dive completed");
                    text
                }
                _ => ANALYSIS_EMPTY_FALLBACK.to_string(),
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Deep dive failed, using fallback");
                ANALYSIS_FALLBACK.to_string()
            }
            Err(_) => {
                warn!(timeout = ?self.aux_timeout, "Deep dive timed out, using fallback");
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{Difficulty, Experience, RouteDraft};
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use std::sync::Arc;

    fn route() -> Route {
        serde_json::from_str::<RouteDraft>(
            r#"{"name": "Ridge Loop", "location": "Golden, CO", "distance": "8 km",
                "difficulty": "Hard", "terrain": "Forest, Ridge", "description": "Steep."}"#,
        )
        .unwrap()
        .into_route(Difficulty::Hard)
    }

    fn prefs() -> Preferences {
        Preferences {
            location: "Golden, CO".to_string(),
            experience: Experience::Beginner,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_analyze_returns_text_verbatim() {
        let analysis = "The climb is steep.\n\nStart early and bring poles.";
        let client = Arc::new(MockLlmClient::texts(&[analysis]));
        let svc = RouteServices::new(client.clone(), PromptLoader::embedded_only(), &Config::default());

        assert_eq!(svc.analyze(&route(), &prefs()).await, analysis);

        let request = &client.requests()[0];
        assert_eq!(request.model, "gemini-3-pro-preview");
        assert_eq!(request.thinking_budget, Some(2048));
        assert!(request.messages[0].content.contains("User Level: Beginner"));
    }

    #[tokio::test]
    async fn test_analyze_falls_back_and_repeats() {
        let client = Arc::new(MockLlmClient::failing());
        let svc = RouteServices::new(client.clone(), PromptLoader::embedded_only(), &Config::default());

        assert_eq!(svc.analyze(&route(), &prefs()).await, ANALYSIS_FALLBACK);
        assert_eq!(svc.analyze(&route(), &prefs()).await, ANALYSIS_FALLBACK);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_analyze_empty_reply() {
        let client = Arc::new(MockLlmClient::texts(&["  "]));
        let svc = RouteServices::new(client, PromptLoader::embedded_only(), &Config::default());
        assert_eq!(svc.analyze(&route(), &prefs()).await, ANALYSIS_EMPTY_FALLBACK);
    }
}
