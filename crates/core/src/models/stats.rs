//! Derived poll statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PollId;

/// Per-option share of the vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionStats {
    pub text: String,
    pub votes: u64,
    pub percentage: u32,
}

/// Read-only summary of a poll and its ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStats {
    pub poll_id: PollId,
    pub question: String,
    pub total_votes: u64,
    pub unique_voters: usize,
    pub options: Vec<OptionStats>,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}
