use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{Backend, Config, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    about = "Anonymous multiple-choice poll server",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "TALLY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(short, long, env = "TALLY_BIND")]
    pub bind: Option<SocketAddr>,

    /// Storage backend (overrides config)
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Data directory (overrides config)
    #[arg(long, env = "TALLY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level override (RUST_LOG still wins)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format override
    #[arg(long)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded file
    pub fn apply(&self, config: &mut Config) {
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(format) = self.log_format {
            config.log.format = format;
        }
    }
}
