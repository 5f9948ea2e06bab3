//! Session orchestrator
//!
//! Ties the model-backed services to the state store. Model calls run
//! outside the store actor; their results come back as events.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{Coordinates, PreferenceError, Preferences, Route};
use crate::llm::{LlmClient, StreamChunk};
use crate::prompts::PromptLoader;
use crate::services::{RequestFailure, RouteServices};
use crate::state::{AppEvent, AppState, StateError, StateResponse, StateStore, TransitionError};

/// Alert shown when a spin fails
pub const SPIN_FAILURE_ALERT: &str = "Oops! Couldn't find a route. Try a different location or wider distance range.";

/// Why a spin produced no route
#[derive(Debug, Error)]
pub enum SpinError {
    #[error("A spin is already in progress")]
    Busy,

    #[error(transparent)]
    Invalid(#[from] PreferenceError),

    #[error(transparent)]
    Request(#[from] RequestFailure),

    #[error("Spin cancelled")]
    Cancelled,

    #[error(transparent)]
    State(StateError),
}

impl From<StateError> for SpinError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::Transition(TransitionError::Busy) => Self::Busy,
            StateError::Transition(TransitionError::Invalid(p)) => Self::Invalid(p),
            StateError::Transition(TransitionError::StaleTicket(_)) => Self::Cancelled,
            other => Self::State(other),
        }
    }
}

/// The in-flight spin
struct SpinSlot {
    ticket: u64,
    abort: AbortHandle,
}

/// One user's Route Roulette session
pub struct Session {
    store: StateStore,
    services: Arc<RouteServices>,
    spin_slot: Mutex<Option<SpinSlot>>,
    chat_lane: Mutex<()>,
}

impl Session {
    pub fn new(config: &Config, llm: Arc<dyn LlmClient>, prompts: PromptLoader) -> Self {
        debug!("Session::new: called");
        Self::with_services(RouteServices::new(llm, prompts, config), AppState::from_config(config))
    }

    pub fn with_services(services: RouteServices, initial: AppState) -> Self {
        Self {
            store: StateStore::spawn(initial),
            services: Arc::new(services),
            spin_slot: Mutex::new(None),
            chat_lane: Mutex::new(()),
        }
    }

    /// Current state
    pub async fn snapshot(&self) -> StateResponse<AppState> {
        self.store.snapshot().await
    }

    /// Request one new route for the current preferences
    ///
    /// Refused with `Busy` while another spin is in flight. `compact` collapses
    /// the preferences panel.
    pub async fn spin(&self, compact: bool) -> Result<Route, SpinError> {
        debug!(%compact, "spin: called");

        let (ticket, handle) = {
            let mut slot = self.spin_slot.lock().await;
            let state = self.store.dispatch(AppEvent::SpinStarted { compact }).await?;
            let ticket = state.scanning_ticket().ok_or(SpinError::Cancelled)?;

            let services = self.services.clone();
            let store = self.store.clone();
            let prefs = state.prefs.clone();
            let handle = tokio::spawn(async move { run_spin(services, store, ticket, prefs).await });

            *slot = Some(SpinSlot {
                ticket,
                abort: handle.abort_handle(),
            });
            (ticket, handle)
        };

        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                debug!(%ticket, "spin: task aborted");
                Err(SpinError::Cancelled)
            }
            Err(e) => {
                error!(%ticket, error = %e, "Spin task panicked");
                let _ = self
                    .store
                    .dispatch(AppEvent::SpinFailed {
                        ticket,
                        reason: SPIN_FAILURE_ALERT.to_string(),
                    })
                    .await;
                Err(SpinError::Cancelled)
            }
        };

        let mut slot = self.spin_slot.lock().await;
        if slot.as_ref().is_some_and(|s| s.ticket == ticket) {
            *slot = None;
        }
        outcome
    }

    /// Abort the in-flight spin, if any
    ///
    /// Returns true when a spin was cancelled.
    pub async fn cancel_spin(&self) -> StateResponse<bool> {
        debug!("cancel_spin: called");
        let mut slot = self.spin_slot.lock().await;
        let ticket = match slot.take() {
            Some(spin) => {
                spin.abort.abort();
                spin.ticket
            }
            // A caller dropped between SpinStarted and the spawn; nothing runs
            // for that ticket, so only the phase needs resetting
            None => match self.store.snapshot().await?.scanning_ticket() {
                Some(ticket) => {
                    warn!(%ticket, "cancel_spin: scanning with no task, resetting");
                    ticket
                }
                None => return Ok(false),
            },
        };

        match self.store.dispatch(AppEvent::SpinCancelled { ticket }).await {
            Ok(_) => Ok(true),
            // The spin finished before the abort landed
            Err(StateError::Transition(TransitionError::StaleTicket(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Analyse the current route; the latest result replaces any earlier one
    pub async fn deep_dive(&self) -> StateResponse<String> {
        debug!("deep_dive: called");
        let state = self.store.snapshot().await?;
        let route = state.current_route.ok_or(TransitionError::NoRoute)?;

        self.store
            .dispatch(AppEvent::DeepDiveStarted {
                route_id: route.id.clone(),
            })
            .await?;
        let analysis = self.services.analyze(&route, &state.prefs).await;
        self.store
            .dispatch(AppEvent::DeepDiveFinished {
                route_id: route.id,
                analysis: analysis.clone(),
            })
            .await?;
        Ok(analysis)
    }

    /// Send one chat message about the current route and wait for the reply
    ///
    /// Sends are handled one at a time. With `chunk_tx` the reply is also
    /// streamed as it arrives.
    pub async fn send_message(&self, text: &str, chunk_tx: Option<mpsc::Sender<StreamChunk>>) -> StateResponse<String> {
        debug!(len = text.len(), streaming = chunk_tx.is_some(), "send_message: called");
        let _lane = self.chat_lane.lock().await;

        let state = self.store.snapshot().await?;
        let route = state.current_route.ok_or(TransitionError::NoRoute)?;
        let prior = state.transcript.messages().to_vec();
        let text = text.trim();

        self.store
            .dispatch(AppEvent::MessageSent {
                route_id: route.id.clone(),
                text: text.to_string(),
            })
            .await?;

        let reply = match chunk_tx {
            Some(tx) => {
                self.services
                    .reply_streaming(&prior, text, &route, &state.prefs, tx)
                    .await
            }
            None => self.services.reply(&prior, text, &route, &state.prefs).await,
        };

        self.store
            .dispatch(AppEvent::MessageReceived {
                route_id: route.id,
                text: reply.clone(),
            })
            .await?;
        Ok(reply)
    }

    /// Replace the preferences wholesale
    pub async fn update_preferences(&self, prefs: Preferences) -> StateResponse<AppState> {
        debug!(location = %prefs.location, "update_preferences: called");
        self.store.dispatch(AppEvent::PreferencesUpdated(prefs)).await
    }

    /// Change one preference field by name
    pub async fn set_preference(&self, field: &str, value: &str) -> StateResponse<AppState> {
        debug!(%field, %value, "set_preference: called");
        let mut prefs = self.store.snapshot().await?.prefs;
        prefs.set_field(field, value).map_err(TransitionError::from)?;
        self.update_preferences(prefs).await
    }

    /// Use coordinates as the location
    pub async fn use_coordinates(&self, coords: Coordinates) -> StateResponse<AppState> {
        debug!(lat = coords.lat, lng = coords.lng, "use_coordinates: called");
        let mut prefs = self.store.snapshot().await?.prefs;
        prefs.location = Preferences::location_from_coords(coords.lat, coords.lng);
        self.update_preferences(prefs).await
    }

    pub async fn toggle_panel(&self) -> StateResponse<AppState> {
        self.store.dispatch(AppEvent::PanelToggled).await
    }

    /// Cancel any spin and stop the store
    pub async fn shutdown(&self) -> StateResponse<()> {
        debug!("shutdown: called");
        self.cancel_spin().await?;
        self.store.shutdown().await
    }
}

/// Body of the spawned spin task
///
/// Reports its own outcome to the store, so a caller that stops waiting
/// cannot leave the session stuck in Scanning.
async fn run_spin(
    services: Arc<RouteServices>,
    store: StateStore,
    ticket: u64,
    prefs: Preferences,
) -> Result<Route, SpinError> {
    debug!(%ticket, "run_spin: called");
    match services.find_route(&prefs).await {
        Ok(route) => {
            let route = services.add_tagline(&route).await;
            store
                .dispatch(AppEvent::SpinSucceeded {
                    ticket,
                    route: route.clone(),
                })
                .await?;
            info!(%ticket, name = %route.name, "Spin complete");
            Ok(route)
        }
        Err(failure) => {
            error!(%ticket, error = %failure, "Route discovery failed");
            if let Err(e) = store
                .dispatch(AppEvent::SpinFailed {
                    ticket,
                    reason: SPIN_FAILURE_ALERT.to_string(),
                })
                .await
            {
                warn!(%ticket, error = %e, "Could not record spin failure");
            }
            Err(SpinError::Request(failure))
        }
    }
}
