//! TCP client for a Tally server
//!
//! Requests are sent one at a time; each call waits for the response
//! carrying its own request id.

use std::net::SocketAddr;
use std::time::Duration;

use tally_core::{NewPoll, Poll, PollFilter, PollId, PollStats, VoteStatus};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Envelope, Message};

/// Default wait for a single response
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Snapshot returned by a health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub version: String,
    pub uptime_secs: u64,
    pub poll_count: usize,
}

/// Client handle for network operations
pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    call_timeout: Duration,
}

impl Client {
    /// Connect to a server
    #[instrument]
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        debug!("Connected");

        Ok(Self {
            reader,
            writer,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Send one request and wait for its reply
    ///
    /// Error replies are turned into [`Error::Remote`]. A timed-out vote
    /// may still have been recorded; check with [`Client::has_voted`]
    /// before retrying.
    pub async fn call(&mut self, body: Message) -> Result<Message> {
        let request = Envelope::new(body);
        write_frame(&mut self.writer, &request).await?;

        let reply: Envelope = tokio::time::timeout(self.call_timeout, read_frame::<_, Envelope>(&mut self.reader))
            .await
            .map_err(|_| Error::Timeout)??;

        if reply.request_id != request.request_id {
            if let Message::Error { code, message } = reply.body {
                return Err(Error::Remote { code, message });
            }
            return Err(Error::Protocol(format!(
                "Reply for {} while waiting on {}",
                reply.request_id, request.request_id
            )));
        }

        match reply.body {
            Message::Error { code, message } => Err(Error::Remote { code, message }),
            body => Ok(body),
        }
    }

    pub async fn ping(&mut self) -> Result<()> {
        match self.call(Message::Ping).await? {
            Message::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn health(&mut self) -> Result<Health> {
        match self.call(Message::Health).await? {
            Message::HealthReport {
                version,
                uptime_secs,
                poll_count,
            } => Ok(Health {
                version,
                uptime_secs,
                poll_count,
            }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_polls(&mut self, status: PollFilter) -> Result<Vec<Poll>> {
        match self.call(Message::ListPolls { status }).await? {
            Message::Polls { polls, .. } => Ok(polls),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_poll(&mut self, id: &PollId) -> Result<Poll> {
        let reply = self.call(Message::GetPoll { id: id.clone() }).await?;
        expect_poll(reply)
    }

    pub async fn create_poll(&mut self, draft: NewPoll) -> Result<Poll> {
        let reply = self.call(Message::create_poll(draft)).await?;
        expect_poll(reply)
    }

    /// Vote as `voter_id`, or as the connection's IP address when `None`
    pub async fn cast_vote(
        &mut self,
        poll_id: &PollId,
        voter_id: Option<&str>,
        option_index: i64,
    ) -> Result<Poll> {
        let reply = self
            .call(Message::CastVote {
                poll_id: poll_id.clone(),
                voter_id: voter_id.map(str::to_string),
                option_index,
            })
            .await?;
        expect_poll(reply)
    }

    pub async fn has_voted(&mut self, poll_id: &PollId, voter_id: Option<&str>) -> Result<VoteStatus> {
        let reply = self
            .call(Message::HasVoted {
                poll_id: poll_id.clone(),
                voter_id: voter_id.map(str::to_string),
            })
            .await?;
        match reply {
            Message::VoteStatus {
                has_voted,
                option_index,
            } => Ok(VoteStatus {
                has_voted,
                option_index,
            }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_poll(&mut self, id: &PollId) -> Result<()> {
        match self.call(Message::DeletePoll { id: id.clone() }).await? {
            Message::Deleted { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn poll_stats(&mut self, id: &PollId) -> Result<PollStats> {
        match self.call(Message::PollStats { id: id.clone() }).await? {
            Message::Stats { stats } => Ok(stats),
            other => Err(unexpected(other)),
        }
    }
}

fn expect_poll(reply: Message) -> Result<Poll> {
    match reply {
        Message::Poll { poll } => Ok(poll),
        other => Err(unexpected(other)),
    }
}

fn unexpected(msg: Message) -> Error {
    Error::UnexpectedResponse(format!("{:?}", msg))
}
