//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. Each
//! request travels in an [`Envelope`] whose `request_id` is echoed back on
//! the matching response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{ErrorKind, NewPoll, Poll, PollFilter, PollId, PollStats};
use uuid::Uuid;

/// Malformed or misdirected request
pub const CODE_BAD_REQUEST: &str = "BAD_REQUEST";
/// The core call did not finish within the server's request timeout
pub const CODE_TIMEOUT: &str = "TIMEOUT";
/// Connection limit reached
pub const CODE_UNAVAILABLE: &str = "UNAVAILABLE";
/// The server failed internally while running the request
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

/// Correlates a request with its response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub request_id: Uuid,
    pub body: Message,
}

impl Envelope {
    pub fn new(body: Message) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            body,
        }
    }

    pub fn reply(&self, body: Message) -> Self {
        Self {
            request_id: self.request_id,
            body,
        }
    }
}

/// Network protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// List polls, optionally restricted to active or expired ones
    ListPolls {
        #[serde(default)]
        status: PollFilter,
    },

    /// Fetch one poll
    GetPoll { id: PollId },

    /// Create a poll
    CreatePoll {
        question: String,
        options: Vec<String>,
        #[serde(default)]
        expires_at: Option<DateTime<Utc>>,
    },

    /// Vote; without a `voter_id` the server uses the peer's IP address
    CastVote {
        poll_id: PollId,
        #[serde(default)]
        voter_id: Option<String>,
        option_index: i64,
    },

    /// Ask whether a voter has voted on a poll
    HasVoted {
        poll_id: PollId,
        #[serde(default)]
        voter_id: Option<String>,
    },

    /// Delete a poll and its vote records
    DeletePoll { id: PollId },

    /// Derived statistics for a poll
    PollStats { id: PollId },

    /// Liveness and basic counters
    Health,

    /// Ping to keep connection alive
    Ping,

    /// Polls matching a listing
    Polls { count: usize, polls: Vec<Poll> },

    /// A single poll (fetched, created, or just voted on)
    Poll { poll: Poll },

    /// Ledger lookup result
    VoteStatus {
        has_voted: bool,
        option_index: Option<usize>,
    },

    /// Poll removed
    Deleted { id: PollId },

    /// Statistics for a poll
    Stats { stats: PollStats },

    /// Health report
    HealthReport {
        version: String,
        uptime_secs: u64,
        poll_count: usize,
    },

    /// Pong response to ping
    Pong,

    /// Request failed
    Error { code: String, message: String },
}

impl Message {
    pub fn create_poll(draft: NewPoll) -> Self {
        Message::CreatePoll {
            question: draft.question,
            options: draft.options,
            expires_at: draft.expires_at,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Message::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Map a core failure to its stable wire code
    pub fn from_core_error(err: &tally_core::Error) -> Self {
        let kind: ErrorKind = err.kind();
        let message = match kind {
            // Storage details stay in the server log
            ErrorKind::Storage => "Storage operation failed".to_string(),
            _ => err.to_string(),
        };
        Self::error(kind.code(), message)
    }

    /// True for messages a client may send
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Message::ListPolls { .. }
                | Message::GetPoll { .. }
                | Message::CreatePoll { .. }
                | Message::CastVote { .. }
                | Message::HasVoted { .. }
                | Message::DeletePoll { .. }
                | Message::PollStats { .. }
                | Message::Health
                | Message::Ping
        )
    }

    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
