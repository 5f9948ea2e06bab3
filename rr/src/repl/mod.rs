//! Interactive REPL for Route Roulette
//!
//! Set preferences with slash commands, spin for a route, then chat with the
//! guide about it in plain text.

mod session;

pub use session::ReplSession;

use eyre::{Context, Result};

use crate::config::Config;
use crate::geo::IpGeolocator;
use crate::llm::create_client;
use crate::prompts::PromptLoader;
use crate::session::Session;

/// Run the interactive REPL
///
/// This is the main entry point for `rr` and `rr repl`.
pub async fn run_interactive(config: &Config) -> Result<()> {
    config.validate()?;

    let llm = create_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let session = Session::new(config, llm, PromptLoader::new(root));
    let geo = IpGeolocator::from_config(&config.geo).context("Failed to create geolocation client")?;

    let mut repl = ReplSession::new(session, Box::new(geo), config.session.compact_width);
    repl.run().await
}
