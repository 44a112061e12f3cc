//! Poll repository
//!
//! CRUD over the poll collection. Every read first brings expiry flags up
//! to date and writes back any poll that just expired.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};

use crate::error::{Error, Result};
use crate::expiry;
use crate::id::generate_poll_id;
use crate::invariants::assert_poll_invariants;
use crate::ledger::VoteLedger;
use crate::models::{NewPoll, Poll, PollFilter, PollId};
use crate::storage::Store;

/// View over the poll collection, valid for a single operation
pub struct PollRepository<'a, S: Store + ?Sized> {
    store: &'a mut S,
    now: DateTime<Utc>,
}

impl<'a, S: Store + ?Sized> PollRepository<'a, S> {
    pub fn new(store: &'a mut S, now: DateTime<Utc>) -> Self {
        Self { store, now }
    }

    /// Load all polls with expiry applied, persisting any transitions
    fn load_refreshed(&mut self) -> Result<Vec<Poll>> {
        let mut polls = self.store.load_polls()?;
        let expired = expiry::refresh_all(&mut polls, self.now);
        if expired > 0 {
            debug!(expired, "Persisting newly expired polls");
            self.store.save_all_polls(&polls)?;
        }
        Ok(polls)
    }

    /// List polls matching `filter`, most recently created first
    #[instrument(skip(self))]
    pub fn list(&mut self, filter: PollFilter) -> Result<Vec<Poll>> {
        let polls = self.load_refreshed()?;
        Ok(polls.into_iter().filter(|p| filter.matches(p)).collect())
    }

    /// Find a poll by id
    pub fn get(&mut self, id: &PollId) -> Result<Poll> {
        self.load_refreshed()?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Validate and store a new poll at the head of the collection
    #[instrument(skip(self, draft))]
    pub fn create(&mut self, draft: NewPoll) -> Result<Poll> {
        let draft = draft.validate()?;

        let mut polls = self.store.load_polls()?;
        let mut id = generate_poll_id(self.now);
        while polls.iter().any(|p| p.id == id) {
            id = generate_poll_id(self.now);
        }

        let poll = Poll::new(id, draft, self.now);
        assert_poll_invariants(&poll);

        polls.insert(0, poll.clone());
        self.store.save_all_polls(&polls)?;

        info!(poll_id = %poll.id, question = %poll.question, "Poll created");
        Ok(poll)
    }

    /// Remove a poll and cascade to its vote records
    ///
    /// Votes go first; if the poll write then fails they are put back.
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &PollId) -> Result<Poll> {
        let mut polls = self.store.load_polls()?;
        let pos = polls
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| not_found(id))?;

        let removed = polls.remove(pos);
        let ballots = VoteLedger::new(&mut *self.store).drop_all(id)?;
        if let Err(e) = self.store.save_all_polls(&polls) {
            if let Some(ballots) = ballots {
                if let Err(restore_err) = VoteLedger::new(&mut *self.store).restore(id, ballots) {
                    error!(poll_id = %id, error = %restore_err, "Failed to restore votes after aborted delete");
                }
            }
            return Err(e);
        }

        info!(poll_id = %id, question = %removed.question, "Poll deleted");
        Ok(removed)
    }

    /// Count one vote for option `slot` and persist the poll
    pub fn add_vote(&mut self, id: &PollId, slot: usize) -> Result<Poll> {
        let mut polls = self.store.load_polls()?;
        let poll = polls
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| not_found(id))?;

        poll.add_vote(slot);
        assert_poll_invariants(poll);
        let updated = poll.clone();

        self.store.save_all_polls(&polls)?;
        Ok(updated)
    }
}

fn not_found(id: &PollId) -> Error {
    Error::NotFound(format!("Poll {} not found", id))
}
