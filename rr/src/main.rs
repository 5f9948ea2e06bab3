//! Route Roulette - spin the wheel for your next hike
//!
//! CLI entry point: the interactive REPL or a one-shot spin.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use routeroulette::cli::{Cli, Command, OutputFormat, SpinArgs, get_log_path};
use routeroulette::config::Config;
use routeroulette::domain::Preferences;
use routeroulette::geo::{GEO_FAILURE_MESSAGE, Geolocator, IpGeolocator};
use routeroulette::llm::create_client;
use routeroulette::prompts::PromptLoader;
use routeroulette::render;
use routeroulette::repl;
use routeroulette::session::{SPIN_FAILURE_ALERT, Session, SpinError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.models.route, "Route Roulette loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Repl) => repl::run_interactive(&config).await,
        Some(Command::Spin(args)) => cmd_spin(&config, &args).await,
    }
}

/// Build the preferences for a one-shot spin
async fn spin_preferences(config: &Config, args: &SpinArgs) -> Result<Preferences> {
    debug!("spin_preferences: called");
    let mut prefs = config.preferences.clone();

    if args.here {
        let geo = IpGeolocator::from_config(&config.geo)?;
        let coords = geo.locate().await.map_err(|e| {
            debug!(error = %e, "spin_preferences: geolocation failed");
            eyre!(GEO_FAILURE_MESSAGE)
        })?;
        prefs.location = Preferences::location_from_coords(coords.lat, coords.lng);
    }

    for (field, value) in args.overrides() {
        prefs
            .set_field(field, &value)
            .map_err(|e| eyre!("Invalid {}: {}", field, e))?;
    }
    prefs.validate()?;
    Ok(prefs)
}

async fn cmd_spin(config: &Config, args: &SpinArgs) -> Result<()> {
    debug!(?args, "cmd_spin: called");
    let prefs = spin_preferences(config, args).await?;

    config.validate()?;
    let llm = create_client(&config.llm).map_err(|e| eyre!("Failed to create LLM client: {}", e))?;
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let session = Session::new(config, llm, PromptLoader::new(root));
    session.update_preferences(prefs).await?;

    if args.format == OutputFormat::Text {
        eprintln!("{}...", render::scanning_word());
    }
    let route = match session.spin(false).await {
        Ok(route) => route,
        Err(SpinError::Request(e)) => {
            debug!(error = %e, "cmd_spin: request failed");
            return Err(eyre!(SPIN_FAILURE_ALERT));
        }
        Err(e) => return Err(e.into()),
    };

    let analysis = if args.deep_dive {
        Some(session.deep_dive().await?)
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "route": route,
                "analysis": analysis,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{}", render::route_card(&route));
            if let Some(analysis) = analysis {
                println!();
                println!("{}", render::analysis_block(&analysis));
            }
        }
    }

    session.shutdown().await?;
    Ok(())
}
