//! REPL session management

use std::io::{self, Write};

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::geo::{GEO_FAILURE_MESSAGE, Geolocator};
use crate::llm::StreamChunk;
use crate::render;
use crate::services::RequestFailure;
use crate::session::{SPIN_FAILURE_ALERT, Session, SpinError};
use crate::state::{StateError, TransitionError};

const DIFFICULTY_CHOICES: &str = "Easy, Moderate, Hard";
const TIME_CHOICES: &str = "Morning, Afternoon, Evening, Full Day";

/// Interactive REPL session
pub struct ReplSession {
    session: Session,
    geo: Box<dyn Geolocator>,
    compact_width: u16,
}

impl ReplSession {
    pub fn new(session: Session, geo: Box<dyn Geolocator>, compact_width: u16) -> Self {
        Self {
            session,
            geo,
            compact_width,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        self.print_panel().await;

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.chat(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        if let Err(e) = self.session.shutdown().await {
            warn!(error = %e, "Session shutdown failed");
        }
        println!("Happy trails!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Route Roulette".bright_cyan().bold());
        println!("Set your preferences, then {} for a trail.", "/spin".yellow());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        debug!(%input, "handle_slash_command: called");
        let mut parts = input.splitn(3, char::is_whitespace);
        let cmd = parts.next().unwrap_or("");
        let arg1 = parts.next().unwrap_or("").trim();
        let rest = parts.next().unwrap_or("").trim();

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/set" => self.set(arg1, rest).await,
            "/prefs" | "/p" => self.print_panel().await,
            "/panel" => match self.session.toggle_panel().await {
                Ok(state) => println!("{}", render::preferences_panel(&state.prefs, state.panel_open)),
                Err(e) => print_error(&e),
            },
            "/locate" | "/here" => self.locate().await,
            "/spin" | "/s" => self.spin().await,
            "/route" | "/r" => self.print_route().await,
            "/deep" | "/d" => self.deep_dive().await,
            "/history" => self.print_history().await,
            "/chat" => self.print_transcript().await,
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:22} Show this help", "/help".yellow());
        println!("  {:22} Exit the REPL", "/quit".yellow());
        println!("  {:22} Change a preference", "/set <field> <value>".yellow());
        println!("  {:22} Show preferences", "/prefs".yellow());
        println!("  {:22} Collapse or expand the preferences panel", "/panel".yellow());
        println!("  {:22} Use your approximate location", "/locate".yellow());
        println!("  {:22} Find a route (Ctrl+C cancels)", "/spin".yellow());
        println!("  {:22} Show the current route", "/route".yellow());
        println!("  {:22} Safety and suitability deep dive", "/deep".yellow());
        println!("  {:22} Recent routes", "/history".yellow());
        println!("  {:22} Show the guide chat", "/chat".yellow());
        println!();
        println!("{}", "Preference Fields:".bright_cyan());
        println!("  {:22} Place name or \"lat, lng\"", "location".yellow());
        println!("  {:22} Distance range in km", "min, max".yellow());
        println!("  {:22} {}", "difficulty".yellow(), DIFFICULTY_CHOICES);
        println!("  {:22} {}", "time".yellow(), TIME_CHOICES);
        println!("  {:22} Optional HH:MM, blank clears", "start".yellow());
        println!("  {:22} Beginner, Intermediate, Advanced", "experience".yellow());
        println!("  {:22} Anything else the guide should know", "notes".yellow());
        println!();
        println!("Anything that is not a command is sent to the trail guide.");
        println!();
    }

    async fn print_panel(&self) {
        match self.session.snapshot().await {
            Ok(state) => println!("{}", render::preferences_panel(&state.prefs, state.panel_open)),
            Err(e) => print_error(&e),
        }
    }

    async fn set(&self, field: &str, value: &str) {
        if field.is_empty() {
            println!("{} /set <field> <value>", "Usage:".yellow());
            return;
        }
        match self.session.set_preference(field, value).await {
            Ok(state) => println!("{}", render::preferences_panel(&state.prefs, state.panel_open)),
            Err(e) => print_error(&e),
        }
    }

    async fn locate(&self) {
        match self.geo.locate().await {
            Ok(coords) => match self.session.use_coordinates(coords).await {
                Ok(state) => println!("{} {}", "Location set:".bright_green(), state.prefs.location),
                Err(e) => print_error(&e),
            },
            Err(e) => {
                warn!(error = %e, "Geolocation failed");
                println!("{}", GEO_FAILURE_MESSAGE.red());
            }
        }
    }

    async fn spin(&self) {
        let compact = render::is_compact(self.compact_width);
        println!("{}", format!("{}...", render::scanning_word()).bright_yellow());

        let result = tokio::select! {
            result = self.session.spin(compact) => result,
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = self.session.cancel_spin().await {
                    warn!(error = %e, "cancel_spin failed");
                }
                Err(SpinError::Cancelled)
            }
        };

        match result {
            Ok(route) => {
                if let Ok(state) = self.session.snapshot().await
                    && !state.panel_open
                {
                    println!("{}", render::preferences_panel(&state.prefs, false));
                }
                println!();
                println!("{}", render::route_card(&route));
                println!();
                println!(
                    "{} for a deep dive, or ask the guide anything.",
                    "/deep".yellow()
                );
            }
            Err(SpinError::Request(RequestFailure::Llm(e))) if e.is_rate_limit() => {
                println!("{}", SPIN_FAILURE_ALERT.red());
                if let Some(wait) = e.retry_after() {
                    println!("{}", format!("The model is rate limited; wait {}s before spinning again.", wait.as_secs()).dimmed());
                }
            }
            Err(SpinError::Request(_)) => println!("{}", SPIN_FAILURE_ALERT.red()),
            Err(SpinError::Cancelled) => println!("{}", "Spin cancelled.".dimmed()),
            Err(e) => println!("{} {}", "!".red(), e),
        }
    }

    async fn print_route(&self) {
        match self.session.snapshot().await {
            Ok(state) => match state.current_route {
                Some(route) => println!("{}", render::route_card(&route)),
                None => println!("{}", "No route yet. Try /spin.".dimmed()),
            },
            Err(e) => print_error(&e),
        }
    }

    async fn deep_dive(&self) {
        println!("{}", "Consulting the rangers...".dimmed());
        match self.session.deep_dive().await {
            Ok(analysis) => println!("{}", render::analysis_block(&analysis)),
            Err(e) => print_error(&e),
        }
    }

    async fn print_history(&self) {
        match self.session.snapshot().await {
            Ok(state) => println!("{}", render::history_list(&state.history)),
            Err(e) => print_error(&e),
        }
    }

    async fn print_transcript(&self) {
        match self.session.snapshot().await {
            Ok(state) if state.transcript.is_empty() => println!("{}", "No conversation yet.".dimmed()),
            Ok(state) => {
                for message in state.transcript.messages() {
                    println!("{}", render::chat_message(message));
                }
            }
            Err(e) => print_error(&e),
        }
    }

    /// Send a chat message, streaming the reply
    async fn chat(&self, input: &str) {
        let (tx, mut rx) = mpsc::channel::<StreamChunk>(100);

        let print_handle = tokio::spawn(async move {
            let mut streamed = String::new();
            while let Some(chunk) = rx.recv().await {
                match chunk {
                    StreamChunk::TextDelta(text) => {
                        if streamed.is_empty() {
                            print!("{} ", "Guide:".bright_blue());
                        }
                        print!("{}", text);
                        let _ = io::stdout().flush();
                        streamed.push_str(&text);
                    }
                    StreamChunk::MessageDone { .. } => {}
                    StreamChunk::Error(err) => {
                        debug!(%err, "chat: stream error");
                    }
                }
            }
            streamed
        });

        let result = self.session.send_message(input, Some(tx)).await;
        let streamed = print_handle.await.unwrap_or_default();

        match result {
            Ok(reply) if reply_was_streamed(&streamed, &reply) => println!(),
            Ok(reply) => {
                // Cut off mid-stream: end the partial line, then show what was kept
                if !streamed.is_empty() {
                    println!();
                }
                println!("{} {}", "Guide:".bright_blue(), reply);
            }
            Err(e) => print_error(&e),
        }
    }
}

/// True when the streamed text is the reply that was stored
fn reply_was_streamed(streamed: &str, reply: &str) -> bool {
    !streamed.is_empty() && streamed.trim() == reply
}

fn print_error(e: &StateError) {
    match e {
        StateError::Transition(TransitionError::NoRoute) => {
            println!("{}", "Spin first to get a route to talk about.".dimmed())
        }
        StateError::Transition(TransitionError::StaleRoute(_)) => {
            println!("{}", "The route changed while waiting for that answer.".dimmed())
        }
        other => println!("{} {}", "!".red(), other),
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, TimeWindow};
    use crate::services::CHAT_FALLBACK;

    #[test]
    fn test_help_choices_parse() {
        for choice in DIFFICULTY_CHOICES.split(", ") {
            assert!(choice.parse::<Difficulty>().is_ok(), "{choice}");
        }
        for choice in TIME_CHOICES.split(", ") {
            assert!(choice.parse::<TimeWindow>().is_ok(), "{choice}");
        }
    }

    #[test]
    fn test_reply_was_streamed() {
        assert!(reply_was_streamed("Bring water. \n", "Bring water."));
        assert!(!reply_was_streamed("", "Bring water."));
    }

    #[test]
    fn test_cut_off_stream_is_not_the_reply() {
        assert!(!reply_was_streamed("Yes, the trail is", CHAT_FALLBACK));
    }
}
