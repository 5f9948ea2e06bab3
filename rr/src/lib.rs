//! Route Roulette - spin the wheel for your next hike
//!
//! Describe what kind of hike you want, get one route picked by a grounded
//! Gemini call, then dig in with a deep-dive safety analysis or a chat with
//! the trail guide about that route.
//!
//! # Core Concepts
//!
//! - **One route per spin**: a spin replaces the route, the chat and the analysis
//! - **Only discovery can fail**: tagline, deep dive and chat fall back to fixed text
//! - **Explicit state**: every change is an [`state::AppEvent`] applied by [`state::reduce`]
//! - **Single flight**: a spin while scanning is refused, never queued
//!
//! # Modules
//!
//! - [`domain`] - Preferences, Route and chat types
//! - [`llm`] - LLM client trait and Gemini implementation
//! - [`prompts`] - Prompt templates
//! - [`services`] - Route discovery, tagline, deep dive and chat
//! - [`state`] - AppState, reducer and the store actor
//! - [`session`] - Orchestrates services and state
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod geo;
pub mod llm;
pub mod prompts;
pub mod render;
pub mod repl;
pub mod services;
pub mod session;
pub mod state;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{ChatMessage, ChatRole, Difficulty, Experience, PreferenceError, Preferences, Route, TimeWindow};
pub use geo::{GeoError, Geolocator, IpGeolocator};
pub use llm::{CompletionRequest, CompletionResponse, GeminiClient, LlmClient, LlmError, create_client};
pub use prompts::{PromptContext, PromptLoader};
pub use services::{RequestFailure, RouteServices};
pub use session::{SPIN_FAILURE_ALERT, Session, SpinError};
pub use state::{AppEvent, AppState, SpinPhase, StateError, StateStore, TransitionError, reduce};
