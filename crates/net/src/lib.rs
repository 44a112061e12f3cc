//! Tally Network Library
//!
//! Exposes the voting engine over TCP.
//!
//! # Architecture
//!
//! - **Server**: wraps a shared `VotingEngine`, one task per connection
//! - **Client**: sequential request/response over one connection
//! - **Protocol**: Length-prefixed JSON messages with request ids
//!
//! # Usage
//!
//! ```ignore
//! let engine = Arc::new(VotingEngine::new(JsonFileStore::open("data")?));
//! let server = Server::start(ServerConfig::new(addr), engine).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! let poll = client.create_poll(NewPoll::new("Tea or coffee?", options)).await?;
//! client.cast_vote(&poll.id, Some("v1"), 0).await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, Health};
pub use error::{Error, Result};
pub use protocol::{Envelope, Message};
pub use server::{Server, ServerConfig};

/// Default port for Tally servers
pub const DEFAULT_PORT: u16 = 7340;
