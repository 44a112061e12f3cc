//! Tally Core Library
//!
//! Poll and vote consistency engine: models, expiry evaluation, the poll
//! repository, the vote ledger, statistics, and storage adapters.

pub mod clock;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod id;
pub mod invariants;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod stats;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::VotingEngine;
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use stats::compute_stats;
pub use storage::{JsonFileStore, MemoryStore, SqliteStore, Store};
