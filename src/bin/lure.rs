//! Lure CLI Binary
//!
//! Command-line interface for the lure phishing-simulation generator.

use clap::Parser;
use lure::cli::{Cli, RunContext};
use lure::config::ConfigLoader;
use lure::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Credentials commonly live in a .env file next to the invocation
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Lure CLI starting");

    let context = match RunContext::new(cli.config.as_deref()) {
        Ok(context) => context,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = context.execute(&cli.command).await {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    info!("Command completed successfully");
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load(cli.config.as_deref())
        .ok()
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_logging_config_quiet() {
        let cli = Cli::try_parse_from(["lure", "--quiet", "context"]).unwrap();
        let config = build_logging_config(&cli);
        assert!(!config.enabled, "quiet should disable logging");
    }

    #[test]
    fn test_build_logging_config_verbose() {
        let cli = Cli::try_parse_from(["lure", "--verbose", "context"]).unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.level, "debug", "verbose should set level to debug");
    }
}
