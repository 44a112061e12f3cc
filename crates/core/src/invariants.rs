//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::{Poll, PollVotes, MIN_OPTIONS};

/// Validate that a poll's counters are internally consistent
pub fn assert_poll_invariants(poll: &Poll) {
    debug_assert!(
        poll.total_votes == poll.tally_sum(),
        "Poll {} total_votes {} != option sum {}",
        poll.id,
        poll.total_votes,
        poll.tally_sum()
    );

    debug_assert!(
        poll.options.len() >= MIN_OPTIONS,
        "Poll {} has {} options",
        poll.id,
        poll.options.len()
    );

    debug_assert!(
        !poll.question.trim().is_empty(),
        "Poll {} has empty question",
        poll.id
    );
}

/// Validate that every ledger record points at a real option
pub fn assert_ledger_matches_poll(poll: &Poll, votes: &PollVotes) {
    debug_assert!(
        votes.values().all(|r| r.option_index < poll.options.len()),
        "Poll {} ledger references an option out of range",
        poll.id
    );
}
