mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn init_logging() {
    let use_json = std::env::var("TETHER_LOG_JSON").is_ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Server {
            port,
            idle_timeout,
            heartbeat,
        } => commands::cmd_server(&cli.keys_dir, *port, *idle_timeout, *heartbeat).await,
        Commands::Client { port, host, echo } => {
            commands::cmd_client(&cli.keys_dir, host, *port, echo.as_deref()).await
        }
        Commands::GenerateKeys { name } => commands::cmd_generate_keys(&cli.keys_dir, name),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(class = e.class(), error = %e, "tethernode failed");
            ExitCode::from(1)
        }
    }
}
