mod cli;
mod collector;
mod config;
mod error;
mod lookup;
mod report;
mod scanner;

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;

use crate::collector::{Collector, UnreadablePolicy};
use crate::config::ConfigManager;
use crate::error::ScanError;
use crate::lookup::{HttpTransport, LookupClient, LookupSettings, RetryPolicy};
use crate::report::Renderer;
use crate::scanner::Scanner;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

fn main() -> ExitCode {
    env_logger::init();

    let cli = cli::Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!(
                "{}",
                style(format!("[!] ERROR: {:#}", err)).red().for_stderr()
            );
            err.downcast_ref::<ScanError>()
                .map(ScanError::exit_code)
                .unwrap_or(ExitCode::FAILURE)
        }
    }
}

fn run(cli: &cli::Cli) -> Result<()> {
    let config_manager = ConfigManager::new(cli.config.clone());
    let api_key = config_manager
        .resolve_api_key(Some(cli.key.as_str()))
        .map_err(ScanError::from)?;

    let policy = if cli.skip_unreadable {
        UnreadablePolicy::Skip
    } else {
        UnreadablePolicy::Abort
    };
    let retry = match cli.retries {
        0 => RetryPolicy::none(),
        limit => RetryPolicy::new(limit, RETRY_BASE_DELAY),
    };
    let transport = HttpTransport::new(Duration::from_secs(cli.timeout), retry)?;
    let settings = LookupSettings::new(api_key).with_endpoint(cli.endpoint.as_str());
    let scanner = Scanner::new(
        Collector::new(policy),
        LookupClient::new(settings, transport),
    );

    let entries = scanner.run(&cli.path)?;
    Renderer::new(cli.format, console::colors_enabled()).render(&mut io::stdout().lock(), &entries)
}
