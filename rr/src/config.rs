//! Route Roulette configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::domain::Preferences;

/// Main Route Roulette configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Session limits and timeouts
    pub session: SessionConfig,

    /// Geolocation lookup
    pub geo: GeoConfig,

    /// Starting preferences for every session
    pub preferences: Preferences,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variable is set. Call this before
    /// creating an LLM client to fail fast with a clear message.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .routeroulette.yml
        let local_config = PathBuf::from(".routeroulette.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/routeroulette/routeroulette.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed: the full load reports them once logging exists.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("routeroulette").join("routeroulette.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum output tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries for transient HTTP errors (0 = never retry)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Thinking budget for the deep-dive analysis
    #[serde(rename = "thinking-budget")]
    pub thinking_budget: u32,

    /// Model per call
    pub models: ModelsConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 120_000,
            max_retries: 0,
            thinking_budget: 2048,
            models: ModelsConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        debug!(api_key_env = %self.api_key_env, "get_api_key: called");
        let key = std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("Environment variable {} is not set", self.api_key_env))?;
        if key.trim().is_empty() {
            return Err(eyre::eyre!("Environment variable {} is empty", self.api_key_env));
        }
        Ok(key)
    }
}

/// Which model serves which call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Grounded route discovery
    pub route: String,

    /// Short marketing tagline
    pub tagline: String,

    /// Deep-dive safety analysis
    pub analysis: String,

    /// Guide chat
    pub chat: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            route: "gemini-2.5-flash".to_string(),
            tagline: "gemini-2.5-flash-lite".to_string(),
            analysis: "gemini-3-pro-preview".to_string(),
            chat: "gemini-3-pro-preview".to_string(),
        }
    }
}

/// Session limits and per-call timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Past routes kept, most recent first
    #[serde(rename = "history-limit")]
    pub history_limit: usize,

    /// Chat messages kept before the oldest are dropped
    #[serde(rename = "transcript-limit")]
    pub transcript_limit: usize,

    /// Timeout for route discovery in milliseconds
    #[serde(rename = "route-timeout-ms")]
    pub route_timeout_ms: u64,

    /// Timeout for tagline, deep-dive and chat calls in milliseconds
    #[serde(rename = "aux-timeout-ms")]
    pub aux_timeout_ms: u64,

    /// Terminal width (columns) below which the preferences panel collapses on spin
    #[serde(rename = "compact-width")]
    pub compact_width: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 5,
            transcript_limit: 40,
            route_timeout_ms: 90_000,
            aux_timeout_ms: 45_000,
            compact_width: 80,
        }
    }
}

impl SessionConfig {
    pub fn route_timeout(&self) -> Duration {
        Duration::from_millis(self.route_timeout_ms)
    }

    pub fn aux_timeout(&self) -> Duration {
        Duration::from_millis(self.aux_timeout_ms)
    }
}

/// Geolocation lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Endpoint returning JSON with `latitude` and `longitude`
    pub url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            url: "https://ipapi.co/json/".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Difficulty;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.session.history_limit, 5);
        assert_eq!(config.llm.max_retries, 0);
        assert!(config.preferences.location.is_empty());
    }

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();

        assert_eq!(config.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.models.route, "gemini-2.5-flash");
        assert_eq!(config.models.tagline, "gemini-2.5-flash-lite");
        assert_eq!(config.thinking_budget, 2048);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

llm:
  api-key-env: MY_GEMINI_KEY
  base-url: https://gemini.example.com
  max-tokens: 4096
  timeout-ms: 60000
  models:
    chat: gemini-2.5-flash

session:
  history-limit: 3
  route-timeout-ms: 30000

preferences:
  location: Chamonix
  difficulty: Hard
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.api_key_env, "MY_GEMINI_KEY");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.llm.models.chat, "gemini-2.5-flash");
        assert_eq!(config.llm.models.route, "gemini-2.5-flash");
        assert_eq!(config.session.history_limit, 3);
        assert_eq!(config.session.route_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.aux_timeout(), Duration::from_secs(45));
        assert_eq!(config.preferences.location, "Chamonix");
        assert_eq!(config.preferences.difficulty, Difficulty::Hard);
        assert_eq!(config.preferences.max_distance, 10.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  provider: gemini
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.session.transcript_limit, 40);
        assert_eq!(config.geo.url, "https://ipapi.co/json/");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rr.yml");
        std::fs::write(&path, "session:\n  history-limit: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.session.history_limit, 7);
    }

    #[test]
    fn test_load_explicit_path_missing_fails() {
        let path = PathBuf::from("/definitely/not/here/rr.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_validate_and_api_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "RR_TEST_API_KEY".to_string();

        // SAFETY: serialized test, no other thread reads this variable
        unsafe { std::env::remove_var("RR_TEST_API_KEY") };
        assert!(config.validate().is_err());
        assert!(config.llm.get_api_key().is_err());

        unsafe { std::env::set_var("RR_TEST_API_KEY", "secret") };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.get_api_key().unwrap(), "secret");

        unsafe { std::env::remove_var("RR_TEST_API_KEY") };
    }
}
