//! Storage adapter trait
//!
//! The core reads and writes whole collections through this interface,
//! allowing for different implementations (JSON files, SQLite, memory).

use crate::error::Result;
use crate::models::{Poll, VoteBook};

/// Durable home of the poll and vote collections
///
/// Implementations must start out with empty collections when no prior
/// state exists, and a failed save must leave the previously saved
/// collection intact. Callers serialize all access; an implementation
/// never sees two concurrent calls.
pub trait Store: Send {
    /// Load every poll, in stored order
    fn load_polls(&self) -> Result<Vec<Poll>>;

    /// Replace the whole poll collection
    fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()>;

    /// Load every vote record, grouped by poll
    fn load_votes(&self) -> Result<VoteBook>;

    /// Replace the whole vote collection
    fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn load_polls(&self) -> Result<Vec<Poll>> {
        (**self).load_polls()
    }

    fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()> {
        (**self).save_all_polls(polls)
    }

    fn load_votes(&self) -> Result<VoteBook> {
        (**self).load_votes()
    }

    fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()> {
        (**self).save_all_votes(votes)
    }
}
