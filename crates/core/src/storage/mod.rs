//! Storage adapters for the poll and vote collections

mod json;
mod memory;
mod migrations;
mod parse;
mod sqlite;
mod traits;

pub use json::{JsonFileStore, POLLS_FILE, VOTES_FILE};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;
