//! Poll expiry evaluation
//!
//! Expiry is decided lazily on read: a poll whose deadline has passed is
//! flagged `expired` the next time anything looks at it. The flag is
//! monotone and never cleared.

use chrono::{DateTime, Utc};

use crate::models::Poll;

/// Return the poll as it should be seen at `now`
pub fn evaluate(poll: &Poll, now: DateTime<Utc>) -> Poll {
    let mut next = poll.clone();
    mark_if_due(&mut next, now);
    next
}

/// In-place variant of [`evaluate`]; returns true if the flag flipped
pub fn mark_if_due(poll: &mut Poll, now: DateTime<Utc>) -> bool {
    match poll.expires_at {
        Some(deadline) if !poll.expired && deadline <= now => {
            poll.expired = true;
            true
        }
        _ => false,
    }
}

/// Refresh a whole collection; returns how many polls transitioned
pub fn refresh_all(polls: &mut [Poll], now: DateTime<Utc>) -> usize {
    polls
        .iter_mut()
        .map(|p| mark_if_due(p, now))
        .filter(|&changed| changed)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPoll;
    use chrono::Duration;

    fn poll_expiring(at: Option<DateTime<Utc>>, created: DateTime<Utc>) -> Poll {
        let mut draft = NewPoll::new("Q?", vec!["a".into(), "b".into()]);
        draft.expires_at = at;
        Poll::new("p".into(), draft, created)
    }

    #[test]
    fn test_open_ended_poll_never_expires() {
        let now = Utc::now();
        let poll = poll_expiring(None, now);
        let later = evaluate(&poll, now + Duration::days(3650));
        assert!(!later.expired);
    }

    #[test]
    fn test_deadline_in_future_stays_active() {
        let now = Utc::now();
        let poll = poll_expiring(Some(now + Duration::minutes(5)), now);
        assert_eq!(evaluate(&poll, now), poll);
    }

    #[test]
    fn test_deadline_reached_expires() {
        let now = Utc::now();
        let poll = poll_expiring(Some(now), now - Duration::hours(1));
        assert!(evaluate(&poll, now).expired);
        assert!(!poll.expired, "input must be left untouched");
    }

    #[test]
    fn test_expired_is_monotone() {
        let now = Utc::now();
        let poll = poll_expiring(Some(now - Duration::seconds(1)), now - Duration::hours(1));
        let expired = evaluate(&poll, now);
        assert!(expired.expired);

        // Evaluating at an earlier instant must not revive it
        let rewound = evaluate(&expired, now - Duration::days(1));
        assert!(rewound.expired);
    }

    #[test]
    fn test_refresh_all_counts_transitions() {
        let now = Utc::now();
        let mut polls = vec![
            poll_expiring(Some(now - Duration::seconds(1)), now),
            poll_expiring(None, now),
            poll_expiring(Some(now + Duration::seconds(60)), now),
        ];
        assert_eq!(refresh_all(&mut polls, now), 1);
        assert_eq!(refresh_all(&mut polls, now), 0);
    }
}
