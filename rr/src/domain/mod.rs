//! Domain types for Route Roulette
//!
//! Core domain types: Preferences, Route, ChatMessage
//!
//! Everything here lives in memory for a single session. Nothing is persisted.

mod chat;
mod preferences;
mod route;

pub use chat::{ChatMessage, ChatRole, Transcript};
pub use preferences::{Difficulty, Experience, PreferenceError, Preferences, TimeWindow};
pub use route::{Coordinates, DEFAULT_SAFETY_NOTES, Route, RouteDraft, Source, maps_search_link};
