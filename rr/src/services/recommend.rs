//! Route discovery and tagline generation

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::{RequestFailure, RouteServices};
use crate::domain::{Preferences, Route, RouteDraft, Source};
use crate::llm::{CompletionRequest, GroundingTool};
use crate::prompts::{PromptContext, Template};

/// Tagline used when the tagline call fails
pub const TAGLINE_FALLBACK: &str = "Explore the outdoors!";

/// Tagline used when the model answers with nothing
pub const TAGLINE_EMPTY_FALLBACK: &str = "A great adventure awaits!";

const ROUTE_MAX_TOKENS: u32 = 4096;
const ROUTE_THINKING_BUDGET: u32 = 1024;
const TAGLINE_MAX_TOKENS: u32 = 256;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("json fence pattern is valid"));

/// Extract the body of the first ```json fence, or the whole text if unfenced
pub fn strip_json_fence(text: &str) -> &str {
    match JSON_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str(),
        None => text.trim(),
    }
}

impl RouteServices {
    /// Ask the model for one route matching the preferences
    ///
    /// Any network, timeout, empty or unparsable answer is a RequestFailure.
    /// Nothing is retried.
    pub async fn find_route(&self, prefs: &Preferences) -> Result<Route, RequestFailure> {
        debug!(location = %prefs.location, difficulty = %prefs.difficulty, "find_route: called");
        let prompt = self
            .prompts
            .render(Template::Route, &PromptContext::search(prefs))
            .map_err(|e| RequestFailure::Prompt(e.to_string()))?;

        let request = CompletionRequest::prompt(&self.models.route, prompt, ROUTE_MAX_TOKENS)
            .with_tools(vec![GroundingTool::GoogleSearch, GroundingTool::GoogleMaps])
            .with_thinking_budget(ROUTE_THINKING_BUDGET);

        let response = tokio::time::timeout(self.route_timeout, self.llm.complete(request))
            .await
            .map_err(|_| RequestFailure::Timeout(self.route_timeout))??;

        let text = response.trimmed_text().ok_or(RequestFailure::EmptyResponse)?;
        let draft: RouteDraft =
            serde_json::from_str(strip_json_fence(text)).map_err(|e| RequestFailure::Parse(e.to_string()))?;

        let mut route = draft.into_route(prefs.difficulty);
        route.sources = response
            .citations
            .iter()
            .map(|c| Source {
                title: c.title.clone(),
                uri: c.uri.clone(),
            })
            .collect();

        info!(route_id = %route.id, name = %route.name, sources = route.sources.len(), "Route found");
        Ok(route)
    }

    /// Replace the route description with a short tagline
    ///
    /// Never fails: errors and timeouts fall back to a fixed tagline.
    pub async fn add_tagline(&self, route: &Route) -> Route {
        debug!(route_id = %route.id, "add_tagline: called");
        route.with_description(self.tagline(route).await)
    }

    async fn tagline(&self, route: &Route) -> String {
        let prompt = match self.prompts.render(Template::Tagline, &PromptContext::route(route, &Preferences::default())) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Tagline prompt failed to render, using fallback");
                return TAGLINE_FALLBACK.to_string();
            }
        };
        let request = CompletionRequest::prompt(&self.models.tagline, prompt, TAGLINE_MAX_TOKENS);

        match tokio::time::timeout(self.aux_timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => match response.trimmed_text() {
                Some(text) => text.trim_matches('"').to_string(),
                None => {
                    debug!("tagline: empty response");
                    TAGLINE_EMPTY_FALLBACK.to_string()
                }
            },
            Ok(Err(e)) => {
                warn!(error = %e, "Tagline generation failed, using fallback");
                TAGLINE_FALLBACK.to_string()
            }
            Err(_) => {
                warn!(timeout = ?self.aux_timeout, "Tagline generation timed out, using fallback");
                TAGLINE_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{DEFAULT_SAFETY_NOTES, Difficulty};
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{Citation, CompletionResponse};
    use crate::prompts::PromptLoader;
    use std::sync::Arc;

    const ROUTE_REPLY: &str = r#"Here is your spin!
```json
{
  "name": "Ridge Loop",
  "location": "Golden, CO",
  "distance": "8 km",
  "difficulty": "Moderate",
  "terrain": "Forest, Ridge",
  "description": "Pines, switchbacks and a big view."
}
```
Enjoy!"#;

    fn services(client: Arc<MockLlmClient>) -> RouteServices {
        RouteServices::new(client, PromptLoader::embedded_only(), &Config::default())
    }

    fn prefs() -> Preferences {
        Preferences {
            location: "Golden, CO".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_json_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_json_fence("text ```json   {}   ``` more"), "{}");
        assert_eq!(strip_json_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[tokio::test]
    async fn test_find_route_parses_fenced_json() {
        let client = Arc::new(MockLlmClient::texts(&[ROUTE_REPLY]));
        let route = services(client.clone()).find_route(&prefs()).await.unwrap();

        assert_eq!(route.name, "Ridge Loop");
        assert_eq!(route.difficulty, Difficulty::Moderate);
        assert_eq!(route.safety_notes, DEFAULT_SAFETY_NOTES.map(String::from).to_vec());
        assert!(route.maps_link.contains("Ridge%20Loop%20Golden%2C%20CO"));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert_eq!(
            requests[0].tools,
            vec![GroundingTool::GoogleSearch, GroundingTool::GoogleMaps]
        );
        assert!(requests[0].messages[0].content.contains("near Golden, CO"));
        assert_eq!(requests[0].max_tokens, ROUTE_MAX_TOKENS);
        assert_eq!(requests[0].thinking_budget, Some(ROUTE_THINKING_BUDGET));
    }

    #[tokio::test]
    async fn test_find_route_keeps_citations() {
        let mut response = CompletionResponse::text(ROUTE_REPLY);
        response.citations = vec![Citation {
            title: "AllTrails".to_string(),
            uri: "https://example.com/ridge-loop".to_string(),
        }];
        let client = Arc::new(MockLlmClient::new(vec![response]));
        let route = services(client).find_route(&prefs()).await.unwrap();
        assert_eq!(route.sources.len(), 1);
        assert_eq!(route.sources[0].title, "AllTrails");
    }

    #[tokio::test]
    async fn test_find_route_failures() {
        let failing = Arc::new(MockLlmClient::failing());
        assert!(matches!(
            services(failing).find_route(&prefs()).await,
            Err(RequestFailure::Llm(_))
        ));

        let garbage = Arc::new(MockLlmClient::texts(&["I could not find anything, sorry."]));
        assert!(matches!(
            services(garbage).find_route(&prefs()).await,
            Err(RequestFailure::Parse(_))
        ));

        let empty = Arc::new(MockLlmClient::texts(&["   "]));
        assert!(matches!(
            services(empty).find_route(&prefs()).await,
            Err(RequestFailure::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_add_tagline() {
        let client = Arc::new(MockLlmClient::texts(&[ROUTE_REPLY, "\"Climb the ridge, breathe the pines, come home smiling.\""]));
        let svc = services(client.clone());
        let route = svc.find_route(&prefs()).await.unwrap();
        let tagged = svc.add_tagline(&route).await;

        assert_eq!(tagged.id, route.id);
        assert_eq!(tagged.description, "Climb the ridge, breathe the pines, come home smiling.");
        assert_eq!(client.requests()[1].model, "gemini-2.5-flash-lite");
    }

    #[tokio::test]
    async fn test_add_tagline_never_fails() {
        let client = Arc::new(MockLlmClient::texts(&[ROUTE_REPLY]));
        let svc = services(client);
        let route = svc.find_route(&prefs()).await.unwrap();

        // Mock is exhausted, so the tagline call errors
        let tagged = svc.add_tagline(&route).await;
        assert_eq!(tagged.description, TAGLINE_FALLBACK);
    }

    #[tokio::test]
    async fn test_add_tagline_empty_reply() {
        let client = Arc::new(MockLlmClient::texts(&[ROUTE_REPLY, ""]));
        let svc = services(client);
        let route = svc.find_route(&prefs()).await.unwrap();
        assert_eq!(svc.add_tagline(&route).await.description, TAGLINE_EMPTY_FALLBACK);
    }
}
