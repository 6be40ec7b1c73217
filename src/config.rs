//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser)]
#[command(name = "punchclock")]
#[command(about = "A state-managed timer service for topic time tracking")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "7227")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Endpoint that finished time entries are posted to
    #[arg(
        long,
        default_value = "http://127.0.0.1:3000/api/time-entries",
        value_name = "URL"
    )]
    pub entries_url: String,

    /// Snapshot file for crash recovery; defaults to the platform data dir
    #[arg(long, value_name = "PATH")]
    pub snapshot_path: Option<PathBuf>,

    /// Shell command to run when a session starts
    #[arg(long, value_name = "CMD")]
    pub on_start_cmd: Option<String>,

    /// Shell command to run when a count-down completes
    #[arg(long, value_name = "CMD")]
    pub on_complete_cmd: Option<String>,

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

    /// Resolve the snapshot path, falling back to the platform data dir
    pub fn snapshot_file(&self) -> PathBuf {
        match &self.snapshot_path {
            Some(path) => path.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("punchclock")
                .join("timer.json"),
        }
    }
}
