//! Vote ledger records

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PollId;

/// The choice a single voter made on a single poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub option_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// Records for one poll, keyed by voter id
pub type PollVotes = HashMap<String, VoteRecord>;

/// Every vote record, keyed by poll id then voter id
pub type VoteBook = BTreeMap<PollId, PollVotes>;

/// Answer to "has this voter already voted on this poll?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub option_index: Option<usize>,
}

impl VoteStatus {
    pub fn from_record(record: Option<&VoteRecord>) -> Self {
        Self {
            has_voted: record.is_some(),
            option_index: record.map(|r| r.option_index),
        }
    }
}
