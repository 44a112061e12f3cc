//! Tally - anonymous poll server
//!
//! Serves the voting engine over the framed TCP protocol until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tally_core::{PollFilter, VotingEngine};
use tally_net::Server;
use tracing::{error, info};

mod cli;
mod config;
mod error;
mod logging;
mod shutdown;
mod state;

use cli::Cli;
use config::Config;
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tally: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(config.log.level, config.log.format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref(), state::default_config_path())?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting tally");

    let store = state::open_store(&config.storage)?;
    let engine = Arc::new(VotingEngine::new(store));

    let startup = engine.clone();
    let polls = tokio::task::spawn_blocking(move || startup.list_polls(PollFilter::All)).await??;
    let active = polls.iter().filter(|p| p.is_active()).count();
    info!(polls = polls.len(), active, "Polls loaded");

    let server = Server::start(config.server.to_server_config(), engine).await?;
    info!(addr = %server.addr(), "Listening");

    shutdown::shutdown_signal().await;
    server.shutdown();
    info!("Tally stopped");
    Ok(())
}
