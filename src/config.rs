//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "focus-timer")]
#[command(about = "A focus countdown timer with background music sync, served over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File holding the persisted timer state and messages
    #[arg(long, default_value = "focus-timer-state.json")]
    pub state_file: PathBuf,

    /// Directory with music.json, images.json and messages.json
    #[arg(long, default_value = "content")]
    pub content_dir: PathBuf,

    /// External player command (e.g. "mpv --no-video"); the watch URL is appended
    #[arg(long)]
    pub player_command: Option<String>,

    /// Seconds a manual music action suspends timer sync
    #[arg(long, default_value = "5")]
    pub sync_cooldown_secs: u64,

    /// Seconds between automatic saves while the timer has time on it
    #[arg(long, default_value = "5")]
    pub autosave_secs: u64,

    /// Log notifications instead of showing desktop notifications
    #[arg(long)]
    pub no_notifications: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn sync_cooldown(&self) -> Duration {
        Duration::from_secs(self.sync_cooldown_secs)
    }

    /// Autosave period, never shorter than one second
    pub fn autosave_period(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }
}
