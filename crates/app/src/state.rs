//! Store selection and data directory resolution

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use tally_core::{JsonFileStore, MemoryStore, SqliteStore, Store};
use tracing::info;

use crate::config::{Backend, StorageSection, CONFIG_FILE_NAME};

/// SQLite database file name inside the data directory
pub const DATABASE_FILE: &str = "tally.db";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "tally")
}

/// Default config file location, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Configured data directory, or the platform default
pub fn data_dir(storage: &StorageSection) -> tally_core::Result<PathBuf> {
    if let Some(dir) = &storage.data_dir {
        return Ok(dir.clone());
    }
    let dirs = project_dirs().ok_or_else(|| {
        tally_core::Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Open the configured store, creating empty collections if needed
pub fn open_store(storage: &StorageSection) -> tally_core::Result<Box<dyn Store>> {
    if storage.backend == Backend::Memory {
        info!("Using in-memory store; nothing will be persisted");
        return Ok(Box::new(MemoryStore::new()));
    }

    let dir = data_dir(storage)?;
    fs::create_dir_all(&dir)?;

    let store: Box<dyn Store> = match storage.backend {
        Backend::Json => Box::new(JsonFileStore::open(&dir)?),
        Backend::Sqlite => Box::new(SqliteStore::open(dir.join(DATABASE_FILE))?),
        Backend::Memory => Box::new(MemoryStore::new()),
    };
    info!(backend = ?storage.backend, dir = %dir.display(), "Store opened");
    Ok(store)
}
