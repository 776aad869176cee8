//! Configuration and CLI argument handling

use clap::Parser;
use std::path::PathBuf;

use crate::state::Durations;

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "focus-timer")]
#[command(about = "A background focus/break timer served over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Work session length in minutes
    #[arg(short, long, default_value = "25")]
    pub work_minutes: u32,

    /// Break session length in minutes
    #[arg(short, long, default_value = "5")]
    pub break_minutes: u32,

    /// File that finished and partial sessions are appended to (JSON lines)
    #[arg(long, default_value = "sessions.jsonl")]
    pub sessions_file: PathBuf,

    /// Do not flip between work and break when a countdown completes
    #[arg(long)]
    pub no_auto_switch: bool,

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

    /// Initial session lengths, clamped to the supported range
    pub fn durations(&self) -> Durations {
        Durations::from_minutes(self.work_minutes, self.break_minutes)
    }

    pub fn auto_switch(&self) -> bool {
        !self.no_auto_switch
    }
}
