//! In-process store

use crate::error::Result;
use crate::models::{Poll, VoteBook};

use super::Store;

/// Keeps both collections in memory; nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    polls: Vec<Poll>,
    votes: VoteBook,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load_polls(&self) -> Result<Vec<Poll>> {
        Ok(self.polls.clone())
    }

    fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()> {
        self.polls = polls.to_vec();
        Ok(())
    }

    fn load_votes(&self) -> Result<VoteBook> {
        Ok(self.votes.clone())
    }

    fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()> {
        self.votes = votes.clone();
        Ok(())
    }
}
