//! Poll model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum number of options a poll must offer
pub const MIN_OPTIONS: usize = 2;

/// Opaque poll identifier, assigned once at creation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub String);

impl PollId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PollId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PollId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One answer choice and its running tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u64,
}

/// A multiple-choice poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<PollOption>,
    pub total_votes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

impl Poll {
    /// Build a fresh poll with zeroed counters from validated input
    pub fn new(id: PollId, draft: NewPoll, now: DateTime<Utc>) -> Self {
        Self {
            id,
            question: draft.question,
            options: draft
                .options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            total_votes: 0,
            created_at: now,
            expires_at: draft.expires_at,
            expired: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.expired
    }

    /// Sum of per-option counters; equals `total_votes` on a consistent poll
    pub fn tally_sum(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Resolve a caller-supplied index against this poll's options
    pub fn option_slot(&self, index: i64) -> Result<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < self.options.len())
            .ok_or(Error::InvalidOption {
                index,
                option_count: self.options.len(),
            })
    }

    /// Count one vote for the option at `slot`
    pub(crate) fn add_vote(&mut self, slot: usize) {
        self.options[slot].votes += 1;
        self.total_votes += 1;
    }
}

/// Input for poll creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewPoll {
    pub fn new(question: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            question: question.into(),
            options,
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Trim text fields and check shape constraints
    pub fn validate(self) -> Result<Self> {
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return Err(Error::Validation("Question must not be empty".into()));
        }

        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|o| o.trim().to_string())
            .collect();
        if options.len() < MIN_OPTIONS {
            return Err(Error::Validation(format!(
                "A poll needs at least {} options",
                MIN_OPTIONS
            )));
        }
        if let Some(pos) = options.iter().position(|o| o.is_empty()) {
            return Err(Error::Validation(format!("Option {} is empty", pos)));
        }

        Ok(Self {
            question,
            options,
            expires_at: self.expires_at,
        })
    }
}

/// Which polls a listing should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollFilter {
    #[default]
    All,
    Active,
    Expired,
}

impl PollFilter {
    pub fn matches(self, poll: &Poll) -> bool {
        match self {
            PollFilter::All => true,
            PollFilter::Active => !poll.expired,
            PollFilter::Expired => poll.expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(options: &[&str]) -> NewPoll {
        NewPoll::new(
            "Tea or coffee?",
            options.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_validate_trims_fields() {
        let mut d = draft(&[" Tea ", "Coffee"]);
        d.question = "  Tea or coffee?  ".into();
        let d = d.validate().unwrap();
        assert_eq!(d.question, "Tea or coffee?");
        assert_eq!(d.options, vec!["Tea", "Coffee"]);
    }

    #[test]
    fn test_validate_rejects_blank_question() {
        let mut d = draft(&["Tea", "Coffee"]);
        d.question = "   ".into();
        assert!(matches!(d.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_single_option() {
        assert!(matches!(draft(&["Tea"]).validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_option() {
        assert!(matches!(
            draft(&["Tea", " "]).validate(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_option_slot_bounds() {
        let poll = Poll::new("p1".into(), draft(&["Tea", "Coffee"]), Utc::now());
        assert_eq!(poll.option_slot(1).unwrap(), 1);
        assert!(matches!(
            poll.option_slot(2),
            Err(Error::InvalidOption { index: 2, option_count: 2 })
        ));
        assert!(matches!(
            poll.option_slot(-1),
            Err(Error::InvalidOption { index: -1, .. })
        ));
    }

    #[test]
    fn test_serialized_field_names() {
        let poll = Poll::new("p1".into(), draft(&["Tea", "Coffee"]), Utc::now());
        let value = serde_json::to_value(&poll).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["totalVotes"], 0);
        assert!(value["expiresAt"].is_null());
        assert_eq!(value["options"][0]["text"], "Tea");
    }
}
