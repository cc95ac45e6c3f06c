//! wscli - a command-line WS-Management client
//!
//! Sends one WS-Management request (Identify, Get, Put, Create, Delete,
//! Invoke, Enumerate, or any custom action) and prints the response.
//!
//! Exit codes: 0 success, 1 SOAP fault, 2 transport/authentication/protocol
//! error, 3 argument error.

mod cli;

use cli::{Cli, LogFormat};
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wsman::config::Config;

/// Exit code for bad arguments or configuration
const ARG_ERROR: i32 = 3;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration; logging settings come from it, so report failures
    // once logging is up
    let config = Config::load(cli.config.as_ref());
    let (level, json) = match &config {
        Ok(config) => (config.logging.level.clone(), config.logging.format == "json"),
        Err(_) => ("warn".to_string(), false),
    };
    let json = cli.log_format.map_or(json, |format| format == LogFormat::Json);

    init_logging(cli.verbosity(), &level, json);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} failed to load config: {e:#}", "Error:".red().bold());
            std::process::exit(ARG_ERROR);
        }
    };

    let exit_code = match cli::run(&cli, &config).await {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(err) => report(&cli, &err),
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, default_level: &str, json: bool) {
    let filter = match verbosity {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbosity >= 3)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Print an error (and a fault envelope, if there is one) and pick the exit code
fn report(cli: &Cli, err: &wsman::Error) -> i32 {
    if let Some(response) = err.fault_response() {
        match cli.render(response) {
            Ok(xml) => println!("{xml}"),
            Err(e) => tracing::debug!(error = %e, "could not render fault response"),
        }
    }
    if let Some(items) = err.partial_items() {
        tracing::info!(items = items.len(), "items pulled before the enumeration failed");
    }
    eprintln!("{} {err}", "Error:".red().bold());
    err.exit_code()
}
