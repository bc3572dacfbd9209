//! `create-devanthos` entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use devanthos_core::config::AppConfig;

mod commands;
mod output;
mod prompt;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if cli.verbose {
        config.verbose = true;
    }

    init_logging(&config);

    if let Err(e) = cli.execute(&config).await {
        output::print_error(&e.message);
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over the configured level.
fn init_logging(config: &AppConfig) {
    let level = if config.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        "pretty" => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .compact()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
