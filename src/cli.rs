use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::lookup::DEFAULT_ENDPOINT;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Hash files and look them up on VirusTotal in one batched request"
)]
pub struct Cli {
    /// File or folder to look up on VirusTotal
    pub path: PathBuf,
    /// VirusTotal API key; falls back to the config file when empty
    #[arg(long, default_value = "")]
    pub key: String,
    /// Read the API key from this file instead of the default locations
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// Retry the lookup this many times on transport or server errors
    #[arg(long, default_value_t = 0)]
    pub retries: usize,
    /// Warn about files that cannot be read instead of aborting
    #[arg(long)]
    pub skip_unreadable: bool,
    #[arg(long, hide = true, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}
