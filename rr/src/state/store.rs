//! StateStore - actor that owns the AppState
//!
//! Processes commands via channels so every task sees one ordered history
//! of events.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::app::{AppEvent, AppState, reduce};
use super::messages::{StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateStore
#[derive(Clone)]
pub struct StateStore {
    tx: mpsc::Sender<StateCommand>,
}

impl StateStore {
    /// Spawn a new StateStore actor holding `initial`
    pub fn spawn(initial: AppState) -> Self {
        debug!("StateStore::spawn: called");
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(actor_loop(initial, rx));
        info!("StateStore spawned");
        Self { tx }
    }

    /// Apply an event and return the resulting state
    pub async fn dispatch(&self, event: AppEvent) -> StateResponse<AppState> {
        debug!(event = event.name(), "dispatch: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Dispatch { event, reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Current state
    pub async fn snapshot(&self) -> StateResponse<AppState> {
        debug!("snapshot: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(StateCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that owns the AppState and processes commands
async fn actor_loop(mut state: AppState, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateStore actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::Dispatch { event, reply } => {
                debug!(event = event.name(), "actor_loop: Dispatch command");
                let result = match reduce(&state, &event) {
                    Ok(next) => {
                        state = next;
                        Ok(state.clone())
                    }
                    Err(e) => {
                        debug!(event = event.name(), error = %e, "actor_loop: event refused");
                        Err(StateError::from(e))
                    }
                };
                if reply.send(result).is_err() {
                    warn!(event = event.name(), "actor_loop: caller dropped before reply");
                }
            }

            StateCommand::Snapshot { reply } => {
                debug!("actor_loop: Snapshot command");
                let _ = reply.send(state.clone());
            }

            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("StateStore shutting down");
                break;
            }
        }
    }

    debug!("StateStore actor stopped");
}
