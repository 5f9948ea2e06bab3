//! Application state with actor pattern
//!
//! `reduce` is the only place state changes. StateStore owns the current
//! AppState and applies events one at a time via channels.

mod app;
mod messages;
mod store;

pub use app::{AppEvent, AppState, SpinPhase, TransitionError, reduce};
pub use messages::{StateCommand, StateError, StateResponse};
pub use store::StateStore;
