//! AppState and its transitions
//!
//! Spin flow:
//!
//! ```text
//! Idle/Ready --SpinStarted--> Scanning{ticket} --SpinSucceeded--> Ready
//!                                   |  --SpinFailed/SpinCancelled--> Idle
//! ```
//!
//! Every spin gets a fresh ticket. Results carry the ticket (or the route id
//! for deep dives and chat) so a late answer for an abandoned spin or a
//! replaced route is refused instead of overwriting newer state.

use std::collections::VecDeque;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{ChatMessage, PreferenceError, Preferences, Route, Transcript};

/// Where the spin flow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "phase")]
pub enum SpinPhase {
    /// Nothing requested yet, or the last spin failed or was cancelled
    Idle,
    /// A recommendation request is in flight
    Scanning { ticket: u64 },
    /// A route is on display
    Ready,
}

impl SpinPhase {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Self::Scanning { .. })
    }
}

/// Something that happened to the session
#[derive(Debug, Clone)]
pub enum AppEvent {
    PreferencesUpdated(Preferences),
    /// `compact` is true when the view is too narrow to keep the panel open
    SpinStarted { compact: bool },
    SpinSucceeded { ticket: u64, route: Route },
    SpinFailed { ticket: u64, reason: String },
    SpinCancelled { ticket: u64 },
    DeepDiveStarted { route_id: String },
    DeepDiveFinished { route_id: String, analysis: String },
    MessageSent { route_id: String, text: String },
    MessageReceived { route_id: String, text: String },
    PanelToggled,
}

impl AppEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreferencesUpdated(_) => "PreferencesUpdated",
            Self::SpinStarted { .. } => "SpinStarted",
            Self::SpinSucceeded { .. } => "SpinSucceeded",
            Self::SpinFailed { .. } => "SpinFailed",
            Self::SpinCancelled { .. } => "SpinCancelled",
            Self::DeepDiveStarted { .. } => "DeepDiveStarted",
            Self::DeepDiveFinished { .. } => "DeepDiveFinished",
            Self::MessageSent { .. } => "MessageSent",
            Self::MessageReceived { .. } => "MessageReceived",
            Self::PanelToggled => "PanelToggled",
        }
    }
}

/// Why an event was refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("A spin is already in progress")]
    Busy,

    #[error(transparent)]
    Invalid(#[from] PreferenceError),

    #[error("No route selected")]
    NoRoute,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Spin ticket {0} is no longer current")]
    StaleTicket(u64),

    #[error("Route {0} is no longer current")]
    StaleRoute(String),
}

/// Everything the session shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub prefs: Preferences,
    pub phase: SpinPhase,
    pub current_route: Option<Route>,
    pub transcript: Transcript,
    pub analysis: Option<String>,
    pub analyzing: bool,
    /// Most recent first, never longer than `history_limit`
    pub history: VecDeque<Route>,
    pub history_limit: usize,
    pub panel_open: bool,
    /// Message from the last failed spin
    pub alert: Option<String>,
    next_ticket: u64,
}

impl AppState {
    pub fn new(prefs: Preferences, history_limit: usize, transcript_limit: usize) -> Self {
        debug!(%history_limit, %transcript_limit, "AppState::new: called");
        Self {
            prefs,
            phase: SpinPhase::Idle,
            current_route: None,
            transcript: Transcript::new(transcript_limit),
            analysis: None,
            analyzing: false,
            history: VecDeque::with_capacity(history_limit),
            history_limit: history_limit.max(1),
            panel_open: true,
            alert: None,
            next_ticket: 1,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.preferences.clone(),
            config.session.history_limit,
            config.session.transcript_limit,
        )
    }

    /// Ticket of the in-flight spin, if any
    pub fn scanning_ticket(&self) -> Option<u64> {
        match self.phase {
            SpinPhase::Scanning { ticket } => Some(ticket),
            _ => None,
        }
    }

    fn check_ticket(&self, ticket: u64) -> Result<(), TransitionError> {
        match self.phase {
            SpinPhase::Scanning { ticket: current } if current == ticket => Ok(()),
            _ => Err(TransitionError::StaleTicket(ticket)),
        }
    }

    fn check_route(&self, route_id: &str) -> Result<(), TransitionError> {
        match &self.current_route {
            Some(route) if route.id == route_id => Ok(()),
            Some(_) => Err(TransitionError::StaleRoute(route_id.to_string())),
            None => Err(TransitionError::NoRoute),
        }
    }
}

/// Apply one event, returning the next state
///
/// Pure: the input state is never modified, and a refused event leaves the
/// caller holding the unchanged state.
pub fn reduce(state: &AppState, event: &AppEvent) -> Result<AppState, TransitionError> {
    debug!(event = event.name(), phase = ?state.phase, "reduce: called");
    let mut next = state.clone();

    match event {
        AppEvent::PreferencesUpdated(prefs) => {
            next.prefs = prefs.clone();
        }

        AppEvent::SpinStarted { compact } => {
            if state.phase.is_scanning() {
                debug!("reduce: spin refused, already scanning");
                return Err(TransitionError::Busy);
            }
            state.prefs.validate()?;

            let ticket = state.next_ticket;
            next.next_ticket += 1;
            next.phase = SpinPhase::Scanning { ticket };
            next.current_route = None;
            next.transcript.clear();
            next.analysis = None;
            next.analyzing = false;
            next.alert = None;
            if *compact {
                next.panel_open = false;
            }
            info!(%ticket, location = %state.prefs.location, "Spin started");
        }

        AppEvent::SpinSucceeded { ticket, route } => {
            state.check_ticket(*ticket)?;
            next.phase = SpinPhase::Ready;
            next.current_route = Some(route.clone());
            next.history.push_front(route.clone());
            next.history.truncate(state.history_limit);
            info!(%ticket, route_id = %route.id, name = %route.name, "Spin succeeded");
        }

        AppEvent::SpinFailed { ticket, reason } => {
            state.check_ticket(*ticket)?;
            next.phase = SpinPhase::Idle;
            next.alert = Some(reason.clone());
            info!(%ticket, "Spin failed");
        }

        AppEvent::SpinCancelled { ticket } => {
            state.check_ticket(*ticket)?;
            next.phase = SpinPhase::Idle;
            info!(%ticket, "Spin cancelled");
        }

        AppEvent::DeepDiveStarted { route_id } => {
            state.check_route(route_id)?;
            next.analyzing = true;
        }

        AppEvent::DeepDiveFinished { route_id, analysis } => {
            state.check_route(route_id)?;
            next.analysis = Some(analysis.clone());
            next.analyzing = false;
        }

        AppEvent::MessageSent { route_id, text } => {
            state.check_route(route_id)?;
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            next.transcript.push(ChatMessage::user(text.clone()));
        }

        AppEvent::MessageReceived { route_id, text } => {
            state.check_route(route_id)?;
            next.transcript.push(ChatMessage::assistant(text.clone()));
        }

        AppEvent::PanelToggled => {
            next.panel_open = !state.panel_open;
        }
    }

    Ok(next)
}
