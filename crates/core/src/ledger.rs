//! Vote ledger
//!
//! The authoritative record of who voted on what. A `VoteLedger` borrows
//! the store mutably, so holding one already excludes every other reader
//! and writer; check-and-insert in [`VoteLedger::record_vote`] is atomic
//! for as long as the borrow lives.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{PollId, PollVotes, VoteRecord, VoteStatus};
use crate::storage::Store;

/// View over the vote collection, valid for a single operation
pub struct VoteLedger<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> VoteLedger<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Look up the voter's record for a poll
    pub fn has_voted(&self, poll_id: &PollId, voter_id: &str) -> Result<VoteStatus> {
        let book = self.store.load_votes()?;
        let record = book.get(poll_id).and_then(|ballots| ballots.get(voter_id));
        Ok(VoteStatus::from_record(record))
    }

    /// Insert a record unless one already exists for this voter and poll
    pub fn record_vote(
        &mut self,
        poll_id: &PollId,
        voter_id: &str,
        option_index: usize,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut book = self.store.load_votes()?;
        let ballots = book.entry(poll_id.clone()).or_default();

        if let Some(existing) = ballots.get(voter_id) {
            return Err(Error::AlreadyVoted {
                poll_id: poll_id.to_string(),
                option_index: existing.option_index,
            });
        }

        ballots.insert(
            voter_id.to_string(),
            VoteRecord {
                option_index,
                timestamp: now,
            },
        );
        self.store.save_all_votes(&book)?;

        debug!(poll_id = %poll_id, voter_id, option_index, "Vote recorded in ledger");
        Ok(())
    }

    /// Number of distinct voters recorded for a poll
    pub fn voter_count(&self, poll_id: &PollId) -> Result<usize> {
        let book = self.store.load_votes()?;
        Ok(book.get(poll_id).map_or(0, |ballots| ballots.len()))
    }

    /// Remove one voter's record, undoing a `record_vote` whose poll
    /// update failed
    pub fn revoke(&mut self, poll_id: &PollId, voter_id: &str) -> Result<()> {
        let mut book = self.store.load_votes()?;
        let Some(ballots) = book.get_mut(poll_id) else {
            return Ok(());
        };
        if ballots.remove(voter_id).is_none() {
            return Ok(());
        }
        if ballots.is_empty() {
            book.remove(poll_id);
        }
        self.store.save_all_votes(&book)?;

        debug!(poll_id = %poll_id, voter_id, "Vote revoked from ledger");
        Ok(())
    }

    /// Remove every record for a poll, returning what was removed
    pub fn drop_all(&mut self, poll_id: &PollId) -> Result<Option<PollVotes>> {
        let mut book = self.store.load_votes()?;
        let Some(removed) = book.remove(poll_id) else {
            return Ok(None);
        };
        self.store.save_all_votes(&book)?;
        Ok(Some(removed))
    }

    /// Put back records taken by [`VoteLedger::drop_all`]
    pub fn restore(&mut self, poll_id: &PollId, ballots: PollVotes) -> Result<()> {
        let mut book = self.store.load_votes()?;
        book.entry(poll_id.clone()).or_default().extend(ballots);
        self.store.save_all_votes(&book)
    }
}
