//! Voting engine
//!
//! The single entry point for adapters. The store sits behind one mutex
//! and every operation holds it from first read to last write, so each
//! call is atomic with respect to all others. Repository and ledger views
//! are created under the guard and never outlive it.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::invariants::assert_ledger_matches_poll;
use crate::ledger::VoteLedger;
use crate::models::{NewPoll, Poll, PollFilter, PollId, PollStats, VoteStatus};
use crate::repository::PollRepository;
use crate::stats;
use crate::storage::Store;

pub struct VotingEngine<S: Store> {
    store: Mutex<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> VotingEngine<S> {
    /// Create an engine using wall-clock time
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(store),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| Error::Storage("store lock poisoned".into()))
    }

    pub fn list_polls(&self, filter: PollFilter) -> Result<Vec<Poll>> {
        let mut store = self.lock()?;
        PollRepository::new(&mut *store, self.clock.now()).list(filter)
    }

    pub fn get_poll(&self, id: &PollId) -> Result<Poll> {
        let mut store = self.lock()?;
        PollRepository::new(&mut *store, self.clock.now()).get(id)
    }

    pub fn create_poll(&self, draft: NewPoll) -> Result<Poll> {
        let mut store = self.lock()?;
        PollRepository::new(&mut *store, self.clock.now()).create(draft)
    }

    pub fn delete_poll(&self, id: &PollId) -> Result<()> {
        let mut store = self.lock()?;
        PollRepository::new(&mut *store, self.clock.now()).delete(id)?;
        Ok(())
    }

    /// Cast one vote
    ///
    /// The ledger insert happens before the counters move: a duplicate
    /// voter is turned away with `AlreadyVoted` and the poll is left
    /// untouched. If the counter update fails the ledger record is revoked
    /// so the voter can retry. Once both writes land the vote is durable
    /// even if the caller never sees the reply.
    #[instrument(skip(self, voter_id))]
    pub fn cast_vote(&self, poll_id: &PollId, voter_id: &str, option_index: i64) -> Result<Poll> {
        let voter_id = normalize_voter(voter_id)?;
        let mut store = self.lock()?;
        let now = self.clock.now();

        let poll = PollRepository::new(&mut *store, now).get(poll_id)?;
        if poll.expired {
            return Err(Error::PollExpired(format!("Poll {} has expired", poll_id)));
        }
        let slot = poll.option_slot(option_index)?;

        let mut ledger = VoteLedger::new(&mut *store);
        if let Err(e) = ledger.record_vote(poll_id, voter_id, slot, now) {
            if matches!(e, Error::AlreadyVoted { .. }) {
                warn!(poll_id = %poll_id, "Vote rejected, voter already voted");
            }
            return Err(e);
        }

        let updated = match PollRepository::new(&mut *store, now).add_vote(poll_id, slot) {
            Ok(poll) => poll,
            Err(e) => {
                if let Err(revoke_err) = VoteLedger::new(&mut *store).revoke(poll_id, voter_id) {
                    error!(poll_id = %poll_id, error = %revoke_err, "Failed to revoke uncounted vote");
                }
                return Err(e);
            }
        };
        if cfg!(debug_assertions) {
            let book = store.load_votes()?;
            if let Some(ballots) = book.get(poll_id) {
                assert_ledger_matches_poll(&updated, ballots);
            }
        }

        info!(poll_id = %poll_id, option = slot, total_votes = updated.total_votes, "Vote cast");
        Ok(updated)
    }

    /// Whether `voter_id` has a ledger record for the poll
    ///
    /// Unknown polls read as "not voted".
    pub fn has_voted(&self, poll_id: &PollId, voter_id: &str) -> Result<VoteStatus> {
        let voter_id = normalize_voter(voter_id)?;
        let mut store = self.lock()?;
        VoteLedger::new(&mut *store).has_voted(poll_id, voter_id)
    }

    /// Distinct voters recorded for a poll, 0 for unknown ids
    pub fn voter_count(&self, poll_id: &PollId) -> Result<usize> {
        let mut store = self.lock()?;
        VoteLedger::new(&mut *store).voter_count(poll_id)
    }

    pub fn poll_stats(&self, id: &PollId) -> Result<PollStats> {
        let mut store = self.lock()?;
        let poll = PollRepository::new(&mut *store, self.clock.now()).get(id)?;
        let unique_voters = VoteLedger::new(&mut *store).voter_count(id)?;
        Ok(stats::compute_stats(&poll, unique_voters))
    }
}

fn normalize_voter(voter_id: &str) -> Result<&str> {
    let trimmed = voter_id.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Voter id must not be empty".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use crate::models::VoteBook;
    use crate::storage::{JsonFileStore, MemoryStore};
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose saves can be switched to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_poll_saves: Arc<AtomicBool>,
        fail_vote_saves: Arc<AtomicBool>,
    }

    impl Store for FlakyStore {
        fn load_polls(&self) -> Result<Vec<Poll>> {
            self.inner.load_polls()
        }

        fn save_all_polls(&mut self, polls: &[Poll]) -> Result<()> {
            if self.fail_poll_saves.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".into()));
            }
            self.inner.save_all_polls(polls)
        }

        fn load_votes(&self) -> Result<VoteBook> {
            self.inner.load_votes()
        }

        fn save_all_votes(&mut self, votes: &VoteBook) -> Result<()> {
            if self.fail_vote_saves.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".into()));
            }
            self.inner.save_all_votes(votes)
        }
    }

    fn flaky_engine() -> (VotingEngine<FlakyStore>, Arc<AtomicBool>, Arc<AtomicBool>) {
        let store = FlakyStore::default();
        let polls = store.fail_poll_saves.clone();
        let votes = store.fail_vote_saves.clone();
        (VotingEngine::new(store), polls, votes)
    }

    fn tea_or_coffee() -> NewPoll {
        NewPoll::new("Tea or coffee?", vec!["Tea".into(), "Coffee".into()])
    }

    fn engine() -> VotingEngine<MemoryStore> {
        VotingEngine::new(MemoryStore::new())
    }

    #[test]
    fn test_tea_or_coffee_scenario() {
        let engine = engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();

        let after = engine.cast_vote(&poll.id, "v1", 0).unwrap();
        assert_eq!(after.options[0].votes, 1);
        assert_eq!(after.options[1].votes, 0);
        assert_eq!(after.total_votes, 1);

        let dup = engine.cast_vote(&poll.id, "v1", 1).unwrap_err();
        assert_eq!(dup.kind(), ErrorKind::AlreadyVoted);
        assert_eq!(engine.get_poll(&poll.id).unwrap(), after);

        let bad = engine.cast_vote(&poll.id, "v2", 5).unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::InvalidOption);
        assert!(!engine.has_voted(&poll.id, "v2").unwrap().has_voted);
    }

    #[test]
    fn test_expired_poll_rejects_votes() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let engine = VotingEngine::with_clock(MemoryStore::new(), clock.clone());

        let poll = engine
            .create_poll(tea_or_coffee().with_expiry(now - Duration::seconds(1)))
            .unwrap();
        assert!(!poll.expired);

        assert!(engine.get_poll(&poll.id).unwrap().expired);
        let err = engine.cast_vote(&poll.id, "v1", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PollExpired);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 0);
    }

    #[test]
    fn test_poll_expires_as_clock_advances() {
        let now = Utc::now();
        let clock = Arc::new(ManualClock::new(now));
        let engine = VotingEngine::with_clock(MemoryStore::new(), clock.clone());
        let poll = engine
            .create_poll(tea_or_coffee().with_expiry(now + Duration::minutes(10)))
            .unwrap();

        engine.cast_vote(&poll.id, "early", 1).unwrap();
        clock.advance(Duration::minutes(10));

        let err = engine.cast_vote(&poll.id, "late", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PollExpired);
        assert_eq!(engine.get_poll(&poll.id).unwrap().total_votes, 1);
    }

    #[test]
    fn test_vote_on_missing_poll() {
        let err = engine().cast_vote(&"missing".into(), "v1", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_blank_voter_rejected() {
        let engine = engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();
        let err = engine.cast_vote(&poll.id, "  ", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_delete_resets_voter_count() {
        let engine = engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();
        engine.cast_vote(&poll.id, "v1", 0).unwrap();
        engine.cast_vote(&poll.id, "v2", 1).unwrap();
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 2);

        engine.delete_poll(&poll.id).unwrap();

        assert!(engine.list_polls(PollFilter::All).unwrap().is_empty());
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 0);
        assert_eq!(
            engine.get_poll(&poll.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            engine.delete_poll(&poll.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_stats_use_ledger_voters() {
        let engine = engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();
        for (voter, choice) in [("a", 0), ("b", 0), ("c", 1)] {
            engine.cast_vote(&poll.id, voter, choice).unwrap();
        }

        let stats = engine.poll_stats(&poll.id).unwrap();
        assert_eq!(stats.unique_voters, 3);
        assert_eq!(stats.total_votes, 3);
        assert_eq!(stats.options[0].percentage, 67);
        assert_eq!(stats.options[1].percentage, 33);
    }

    #[test]
    fn test_distinct_voters_race_without_lost_updates() {
        const VOTERS: usize = 64;
        let engine = Arc::new(engine());
        let poll = engine.create_poll(tea_or_coffee()).unwrap();

        std::thread::scope(|s| {
            for i in 0..VOTERS {
                let engine = engine.clone();
                let id = poll.id.clone();
                s.spawn(move || {
                    engine
                        .cast_vote(&id, &format!("voter-{}", i), (i % 2) as i64)
                        .unwrap();
                });
            }
        });

        let poll = engine.get_poll(&poll.id).unwrap();
        assert_eq!(poll.total_votes, VOTERS as u64);
        assert_eq!(poll.tally_sum(), poll.total_votes);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), VOTERS);
    }

    #[test]
    fn test_same_voter_race_counts_once() {
        const ATTEMPTS: usize = 32;
        let engine = Arc::new(engine());
        let poll = engine.create_poll(tea_or_coffee()).unwrap();

        let outcomes: Vec<Result<Poll>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..ATTEMPTS)
                .map(|i| {
                    let engine = engine.clone();
                    let id = poll.id.clone();
                    s.spawn(move || engine.cast_vote(&id, "same-voter", (i % 2) as i64))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let dups = outcomes
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyVoted { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(dups, ATTEMPTS - 1);
        assert_eq!(engine.get_poll(&poll.id).unwrap().total_votes, 1);
    }

    #[test]
    fn test_file_backed_engine_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let poll_id = {
            let engine = VotingEngine::new(JsonFileStore::open(dir.path()).unwrap());
            let poll = engine.create_poll(tea_or_coffee()).unwrap();
            engine.cast_vote(&poll.id, "v1", 1).unwrap();
            poll.id
        };

        let engine = VotingEngine::new(JsonFileStore::open(dir.path()).unwrap());
        assert_eq!(engine.get_poll(&poll_id).unwrap().options[1].votes, 1);
        assert_eq!(
            engine.cast_vote(&poll_id, "v1", 0).unwrap_err().kind(),
            ErrorKind::AlreadyVoted
        );
    }

    #[test]
    fn test_ids_unique_across_concurrent_creates() {
        let engine = Arc::new(engine());
        std::thread::scope(|s| {
            for _ in 0..16 {
                let engine = engine.clone();
                s.spawn(move || engine.create_poll(tea_or_coffee()).unwrap());
            }
        });

        let polls = engine.list_polls(PollFilter::All).unwrap();
        let ids: HashSet<_> = polls.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn test_failed_counter_write_revokes_ledger_record() {
        let (engine, fail_polls, _) = flaky_engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();

        fail_polls.store(true, Ordering::SeqCst);
        let err = engine.cast_vote(&poll.id, "v1", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        fail_polls.store(false, Ordering::SeqCst);

        assert_eq!(engine.get_poll(&poll.id).unwrap().total_votes, 0);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 0);
        assert!(!engine.has_voted(&poll.id, "v1").unwrap().has_voted);

        let retried = engine.cast_vote(&poll.id, "v1", 0).unwrap();
        assert_eq!(retried.total_votes, 1);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 1);
    }

    #[test]
    fn test_failed_ledger_write_leaves_poll_untouched() {
        let (engine, _, fail_votes) = flaky_engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();

        fail_votes.store(true, Ordering::SeqCst);
        let err = engine.cast_vote(&poll.id, "v1", 1).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        fail_votes.store(false, Ordering::SeqCst);

        assert_eq!(engine.get_poll(&poll.id).unwrap(), poll);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 0);
    }

    #[test]
    fn test_failed_create_stores_nothing() {
        let (engine, fail_polls, _) = flaky_engine();

        fail_polls.store(true, Ordering::SeqCst);
        let err = engine.create_poll(tea_or_coffee()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        fail_polls.store(false, Ordering::SeqCst);

        assert!(engine.list_polls(PollFilter::All).unwrap().is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_poll_and_votes() {
        let (engine, fail_polls, fail_votes) = flaky_engine();
        let poll = engine.create_poll(tea_or_coffee()).unwrap();
        engine.cast_vote(&poll.id, "v1", 0).unwrap();

        fail_polls.store(true, Ordering::SeqCst);
        let err = engine.delete_poll(&poll.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        fail_polls.store(false, Ordering::SeqCst);

        assert_eq!(engine.get_poll(&poll.id).unwrap().total_votes, 1);
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 1);

        fail_votes.store(true, Ordering::SeqCst);
        let err = engine.delete_poll(&poll.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        fail_votes.store(false, Ordering::SeqCst);

        assert_eq!(engine.get_poll(&poll.id).unwrap().total_votes, 1);
        assert!(engine.has_voted(&poll.id, "v1").unwrap().has_voted);

        engine.delete_poll(&poll.id).unwrap();
        assert_eq!(engine.voter_count(&poll.id).unwrap(), 0);
    }
}
