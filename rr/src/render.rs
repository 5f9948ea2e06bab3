//! Terminal rendering
//!
//! Pure formatting: every function returns a String and the REPL decides
//! when to print it.

use std::fmt::Write;

use colored::Colorize;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::domain::{ChatMessage, ChatRole, Preferences, Route};

/// Words for the scanning indicator
pub const SCANNING_WORDS: &[&str] = &[
    "Scouting",
    "Scanning",
    "Trailfinding",
    "Surveying",
    "Mapping",
    "Wandering",
    "Rambling",
    "Orienteering",
];

/// Pick a word for the scanning indicator
pub fn scanning_word() -> &'static str {
    let mut rng = rand::rng();
    SCANNING_WORDS.choose(&mut rng).copied().unwrap_or("Scanning")
}

/// True when the terminal is narrower than `compact_width` columns
///
/// Unknown width (not a terminal) counts as wide.
pub fn is_compact(compact_width: u16) -> bool {
    match crossterm::terminal::size() {
        Ok((cols, _)) => {
            debug!(%cols, %compact_width, "is_compact: terminal size");
            cols < compact_width
        }
        Err(_) => false,
    }
}

/// Preferences panel, or a one-line summary when collapsed
pub fn preferences_panel(prefs: &Preferences, open: bool) -> String {
    let location = if prefs.location.trim().is_empty() {
        "(not set)".dimmed().to_string()
    } else {
        prefs.location.bright_white().to_string()
    };

    if !open {
        return format!(
            "{} {} | {}-{} km | {} | {}",
            "Prefs:".bright_cyan(),
            location,
            prefs.min_distance,
            prefs.max_distance,
            prefs.difficulty,
            prefs.time_window
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", "Trail Preferences".bright_cyan().bold());
    let _ = writeln!(out, "  {:12} {}", "location".yellow(), location);
    let _ = writeln!(
        out,
        "  {:12} {} - {} km",
        "distance".yellow(),
        prefs.min_distance,
        prefs.max_distance
    );
    let _ = writeln!(out, "  {:12} {}", "difficulty".yellow(), prefs.difficulty);
    let time = match prefs.start_time_label() {
        Some(start) => format!("{} (start {})", prefs.time_window, start),
        None => prefs.time_window.to_string(),
    };
    let _ = writeln!(out, "  {:12} {}", "time".yellow(), time);
    let _ = writeln!(out, "  {:12} {}", "experience".yellow(), prefs.experience);
    let _ = write!(out, "  {:12} {}", "notes".yellow(), prefs.notes_or_none());
    out
}

/// The route card
pub fn route_card(route: &Route) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", route.name.bright_green().bold());
    let _ = writeln!(
        out,
        "{}  {}  {}",
        route.location.bright_white(),
        route.distance.yellow(),
        route.difficulty.to_string().magenta()
    );
    let _ = writeln!(out, "{} {}", "Terrain:".dimmed(), route.terrain);
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", route.description.italic());
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "Safety".bright_yellow());
    for note in &route.safety_notes {
        let _ = writeln!(out, "  - {}", note);
    }
    if !route.sources.is_empty() {
        let _ = writeln!(out, "{}", "Sources".dimmed());
        for source in &route.sources {
            let _ = writeln!(out, "  {} {}", source.title, source.uri.dimmed());
        }
    }
    let _ = write!(out, "{} {}", "Map:".bright_blue(), route.maps_link.underline());
    out
}

/// Past routes, most recent first
pub fn history_list<'a>(history: impl IntoIterator<Item = &'a Route>) -> String {
    let lines: Vec<String> = history
        .into_iter()
        .enumerate()
        .map(|(i, r)| format!("  {}. {} ({}, {}, {})", i + 1, r.name.bright_white(), r.location, r.distance, r.difficulty))
        .collect();
    if lines.is_empty() {
        "No routes yet. Try /spin.".dimmed().to_string()
    } else {
        lines.join("\n")
    }
}

/// One chat message with its speaker label
pub fn chat_message(message: &ChatMessage) -> String {
    let label = match message.role {
        ChatRole::User => "You".bright_green(),
        ChatRole::Assistant => "Guide".bright_blue(),
    };
    format!("{}: {}", label, message.text)
}

/// Deep-dive analysis block
pub fn analysis_block(analysis: &str) -> String {
    format!("{}\n{}", "Deep Dive".bright_cyan().bold(), analysis)
}
