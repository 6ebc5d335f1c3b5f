//! Libris - library catalog from the command line

mod cli;
mod commands;
mod render;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use libris_client::{Dispatcher, HttpLibraryApi, Session};
use libris_core::LibrisConfig;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Logs go to stderr so tables on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("libris=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = LibrisConfig::load_standard(cli.config.as_deref())?;
    if let Some(api) = cli.api {
        config.api.base_url = api;
        config.validate()?;
    }
    tracing::debug!("Using catalog API at {}", config.api.base_url);

    let api = HttpLibraryApi::new(&config.api)?;
    let mut dispatcher = Dispatcher::new(Session::new(api, config));

    Ok(commands::run(cli.command, &mut dispatcher).await)
}
