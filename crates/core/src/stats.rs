//! Poll statistics
//!
//! Pure derivation from a poll snapshot and its distinct-voter count.

use crate::models::{OptionStats, Poll, PollStats};

/// Share of `votes` in `total`, rounded to the nearest whole percent
pub fn percentage(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (votes as f64 / total as f64 * 100.0).round() as u32
}

pub fn compute_stats(poll: &Poll, unique_voters: usize) -> PollStats {
    PollStats {
        poll_id: poll.id.clone(),
        question: poll.question.clone(),
        total_votes: poll.total_votes,
        unique_voters,
        options: poll
            .options
            .iter()
            .map(|o| OptionStats {
                text: o.text.clone(),
                votes: o.votes,
                percentage: percentage(o.votes, poll.total_votes),
            })
            .collect(),
        expired: poll.expired,
        created_at: poll.created_at,
        expires_at: poll.expires_at,
    }
}
