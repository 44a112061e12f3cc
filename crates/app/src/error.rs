use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Core(#[from] tally_core::Error),

    #[error("server: {0}")]
    Net(#[from] tally_net::Error),

    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
