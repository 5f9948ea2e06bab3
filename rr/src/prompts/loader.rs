//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::{Preferences, Route};

/// The prompts Route Roulette sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Grounded route discovery
    Route,
    /// Ten-word tagline
    Tagline,
    /// Deep-dive safety analysis
    DeepDive,
    /// Guide chat system instruction
    Guide,
}

impl Template {
    /// Get the template file name (without extension)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Tagline => "tagline",
            Self::DeepDive => "deep-dive",
            Self::Guide => "guide",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Context for rendering prompt templates
///
/// Route fields are empty for the search prompt, which only knows the
/// preferences.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub location: String,
    pub difficulty: String,
    pub min_distance: String,
    pub max_distance: String,
    pub time_window: String,
    pub start_time: Option<String>,
    pub experience: String,
    pub notes: String,
    pub name: String,
    pub distance: String,
    pub terrain: String,
}

impl PromptContext {
    /// Context for the route search prompt
    pub fn search(prefs: &Preferences) -> Self {
        debug!(location = %prefs.location, "PromptContext::search: called");
        Self {
            location: prefs.location.trim().to_string(),
            difficulty: prefs.difficulty.to_string(),
            min_distance: prefs.min_distance.to_string(),
            max_distance: prefs.max_distance.to_string(),
            time_window: prefs.time_window.to_string(),
            start_time: prefs.start_time_label(),
            experience: prefs.experience.to_string(),
            notes: prefs.notes_or_none().to_string(),
            ..Default::default()
        }
    }

    /// Context for prompts about a chosen route
    pub fn route(route: &Route, prefs: &Preferences) -> Self {
        debug!(route_id = %route.id, name = %route.name, "PromptContext::route: called");
        Self {
            location: route.location.clone(),
            difficulty: route.difficulty.to_string(),
            name: route.name.clone(),
            distance: route.distance.clone(),
            terrain: route.terrain.clone(),
            ..Self::search(prefs)
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.routeroulette/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at the given directory
    ///
    /// Looks for overrides in `{root}/.routeroulette/prompts/`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let user_dir = root.as_ref().join(".routeroulette/prompts");
        let user_dir_exists = user_dir.exists();
        debug!(?user_dir, %user_dir_exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
        }
    }

    /// Prompts are plain text, so HTML escaping stays off
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.routeroulette/prompts/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
        }

        if let Some(content) = embedded::get_embedded(name) {
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template: Template, context: &PromptContext) -> Result<String> {
        debug!(%template, "PromptLoader::render: called");
        let source = self.load_template(template.name())?;
        self.hbs
            .render_template(&source, context)
            .map(|rendered| rendered.trim().to_string())
            .map_err(|e| eyre!("Failed to render template {}: {}", template, e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::embedded_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Experience, RouteDraft, TimeWindow};
    use chrono::NaiveTime;

    fn prefs() -> Preferences {
        Preferences {
            location: "Boulder, CO".to_string(),
            min_distance: 3.0,
            max_distance: 12.5,
            difficulty: Difficulty::Hard,
            time_window: TimeWindow::Morning,
            experience: Experience::Advanced,
            notes: String::new(),
            start_time: None,
        }
    }

    fn route() -> Route {
        serde_json::from_str::<RouteDraft>(
            r#"{"name": "Ridge Loop", "location": "Golden, CO", "distance": "8 km",
                "difficulty": "Moderate", "terrain": "Forest, Ridge", "description": "Pines and views."}"#,
        )
        .unwrap()
        .into_route(Difficulty::Moderate)
    }

    #[test]
    fn test_template_names() {
        assert_eq!(Template::Route.name(), "route");
        assert_eq!(Template::DeepDive.name(), "deep-dive");
        assert_eq!(Template::Guide.to_string(), "guide");
    }

    #[test]
    fn test_render_search_prompt() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.render(Template::Route, &PromptContext::search(&prefs())).unwrap();

        assert!(prompt.contains("near Boulder, CO"));
        assert!(prompt.contains("Difficulty: Hard"));
        assert!(prompt.contains("Between 3 and 12.5 km"));
        assert!(prompt.contains("Best for: Morning\n"));
        assert!(prompt.contains("User Experience Level: Advanced"));
        assert!(prompt.contains("Specific Requirements: None"));
        assert!(!prompt.contains("specifically around"));
    }

    #[test]
    fn test_render_search_prompt_with_start_time_and_notes() {
        let mut p = prefs();
        p.start_time = NaiveTime::from_hms_opt(7, 30, 0);
        p.notes = "Dog friendly, \"must\" have parking".to_string();
        let prompt = PromptLoader::embedded_only()
            .render(Template::Route, &PromptContext::search(&p))
            .unwrap();

        assert!(prompt.contains("Best for: Morning (specifically around 07:30)"));
        // No HTML escaping of quotes
        assert!(prompt.contains("Dog friendly, \"must\" have parking"));
    }

    #[test]
    fn test_render_route_prompts() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::route(&route(), &prefs());

        let tagline = loader.render(Template::Tagline, &ctx).unwrap();
        assert!(tagline.contains("\"Ridge Loop\" which is Forest, Ridge"));

        let analysis = loader.render(Template::DeepDive, &ctx).unwrap();
        assert!(analysis.contains("Route: Ridge Loop (8 km, Moderate)"));
        assert!(analysis.contains("User Level: Advanced"));

        let guide = loader.render(Template::Guide, &ctx).unwrap();
        assert!(guide.contains("Ridge Loop located in Golden, CO"));
        assert!(guide.contains("Spin Again"));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".routeroulette/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(prompts.join("tagline.pmt"), "Tagline for {{name}} please").unwrap();

        let loader = PromptLoader::new(dir.path());
        let rendered = loader
            .render(Template::Tagline, &PromptContext::route(&route(), &prefs()))
            .unwrap();
        assert_eq!(rendered, "Tagline for Ridge Loop please");

        // Templates without an override still come from the embedded set
        let guide = loader
            .render(Template::Guide, &PromptContext::route(&route(), &prefs()))
            .unwrap();
        assert!(guide.contains("Route Roulette's guide"));
    }
}
