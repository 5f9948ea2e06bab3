//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// Route Roulette - spin the wheel for your next hike
#[derive(Parser)]
#[command(
    name = "rr",
    about = "Spin the wheel for your next hike",
    version = env!("GIT_DESCRIBE"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to the REPL)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive session: set preferences, spin, chat with the guide
    Repl,

    /// Spin once and print the route
    Spin(SpinArgs),
}

/// Preference overrides for a one-shot spin
///
/// Anything not given comes from the config file's preferences.
#[derive(Debug, Default, Args)]
pub struct SpinArgs {
    /// Where to hike: a place name or "lat, lng"
    #[arg(short = 'L', long)]
    pub location: Option<String>,

    /// Use your approximate location
    #[arg(long, conflicts_with = "location")]
    pub here: bool,

    /// Shortest acceptable route in km
    #[arg(long = "min-km")]
    pub min_km: Option<f64>,

    /// Longest acceptable route in km
    #[arg(long = "max-km")]
    pub max_km: Option<f64>,

    /// Easy, Moderate or Hard
    #[arg(short, long)]
    pub difficulty: Option<String>,

    /// Morning, Afternoon, Evening or "Full Day"
    #[arg(short, long)]
    pub time: Option<String>,

    /// Planned start time (HH:MM)
    #[arg(long)]
    pub start: Option<String>,

    /// Beginner, Intermediate or Advanced
    #[arg(short, long)]
    pub experience: Option<String>,

    /// Anything else the route should satisfy
    #[arg(short, long)]
    pub notes: Option<String>,

    /// Also print a deep-dive analysis of the route
    #[arg(long)]
    pub deep_dive: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

impl SpinArgs {
    /// Overrides as (field, value) pairs for `Preferences::set_field`
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        debug!("SpinArgs::overrides: called");
        let mut fields = Vec::new();
        if let Some(ref v) = self.location {
            fields.push(("location", v.clone()));
        }
        if let Some(v) = self.min_km {
            fields.push(("min", v.to_string()));
        }
        if let Some(v) = self.max_km {
            fields.push(("max", v.to_string()));
        }
        if let Some(ref v) = self.difficulty {
            fields.push(("difficulty", v.clone()));
        }
        if let Some(ref v) = self.time {
            fields.push(("time", v.clone()));
        }
        if let Some(ref v) = self.start {
            fields.push(("start", v.clone()));
        }
        if let Some(ref v) = self.experience {
            fields.push(("experience", v.clone()));
        }
        if let Some(ref v) = self.notes {
            fields.push(("notes", v.clone()));
        }
        fields
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("routeroulette")
        .join("logs")
        .join("routeroulette.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Output format for the spin command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::try_parse_from(["rr"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_spin() {
        let cli = Cli::try_parse_from([
            "rr",
            "spin",
            "--location",
            "Boulder, CO",
            "--min-km",
            "4",
            "--max-km",
            "12.5",
            "--difficulty",
            "hard",
            "--start",
            "07:30",
            "--deep-dive",
            "--format",
            "json",
        ])
        .unwrap();

        let Some(Command::Spin(args)) = cli.command else {
            panic!("expected spin");
        };
        assert_eq!(args.location.as_deref(), Some("Boulder, CO"));
        assert_eq!(args.max_km, Some(12.5));
        assert!(args.deep_dive);
        assert_eq!(args.format, OutputFormat::Json);

        let overrides = args.overrides();
        assert!(overrides.contains(&("min", "4".to_string())));
        assert!(overrides.contains(&("difficulty", "hard".to_string())));
        assert!(overrides.contains(&("start", "07:30".to_string())));
    }

    #[test]
    fn test_here_conflicts_with_location() {
        assert!(Cli::try_parse_from(["rr", "spin", "--here", "--location", "Moab"]).is_err());
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from(["rr", "repl", "-c", "/tmp/rr.yml", "-l", "debug"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rr.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Some(Command::Repl)));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
