//! State store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::app::{AppEvent, AppState, TransitionError};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateStore actor
#[derive(Debug)]
pub enum StateCommand {
    /// Apply an event; replies with the resulting state
    Dispatch {
        event: AppEvent,
        reply: oneshot::Sender<StateResponse<AppState>>,
    },

    /// Read the current state
    Snapshot {
        reply: oneshot::Sender<AppState>,
    },

    Shutdown,
}
