//! JSON file store
//!
//! Layout inside the data directory:
//! - `polls.json`: array of polls, most recent first
//! - `votes.json`: object `pollId -> voterId -> {optionIndex, timestamp}`
//!
//! Saves write a sibling temp file and rename it over the target, so a
//! crash mid-write leaves the previous file in place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::{Poll, VoteBook};

use super::Store;

pub const POLLS_FILE: &str = "polls.json";
pub const VOTES_FILE: &str = "votes.json";

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the store in `dir`, creating the directory and empty
    /// collection files if they do not exist yet
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let store = Self { dir };
        if !store.polls_path().exists() {
            store.write_json(&store.polls_path(), &Vec::<Poll>::new())?;
        }
        if !store.votes_path().exists() {
            store.write_json(&store.votes_path(), &VoteBook::new())?;
        }
        Ok(store)
    }

    fn polls_path(&self) -> PathBuf {
        self.dir.join(POLLS_FILE)
    }

    fn votes_path(&self) -> PathBuf {
        self.dir.join(VOTES_FILE)
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let payload = serde_json::to_vec_pretty(value)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), bytes = payload.len(), "Collection written");
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_polls(&self) -> Result<Vec<Poll>> {
        self.read_json(&self.polls_path())
    }

    fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()> {
        self.write_json(&self.polls_path(), &polls)
    }

    fn load_votes(&self) -> Result<VoteBook> {
        self.read_json(&self.votes_path())
    }

    fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()> {
        self.write_json(&self.votes_path(), votes)
    }
}
