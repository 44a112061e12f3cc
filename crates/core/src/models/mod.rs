//! Data models for Tally

mod poll;
mod stats;
mod vote;

pub use poll::*;
pub use stats::*;
pub use vote::*;
