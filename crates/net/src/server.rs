//! TCP server exposing the voting engine
//!
//! One task per connection. Requests on a connection are answered in
//! order; every core call runs on the blocking pool and is bounded by the
//! request timeout.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tally_core::{NewPoll, Store, VotingEngine};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{
    Envelope, Message, CODE_BAD_REQUEST, CODE_INTERNAL, CODE_TIMEOUT, CODE_UNAVAILABLE,
};

/// Default maximum number of concurrent connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Default bound on a single core call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Server tuning
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_connections: usize,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// State shared by every connection task
struct Shared<S: Store> {
    engine: Arc<VotingEngine<S>>,
    request_timeout: Duration,
    started: Instant,
}

/// Running server handle
pub struct Server {
    addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind and start serving `engine`
    pub async fn start<S: Store + 'static>(
        config: ServerConfig,
        engine: Arc<VotingEngine<S>>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind).await?;
        let bound_addr = listener.local_addr()?;

        info!(
            addr = %bound_addr,
            max_connections = config.max_connections,
            "Server started"
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        let shared = Arc::new(Shared {
            engine,
            request_timeout: config.request_timeout,
            started: Instant::now(),
        });
        let permits = Arc::new(Semaphore::new(config.max_connections));

        tokio::spawn(accept_loop(
            listener,
            shared,
            permits,
            shutdown_tx.clone(),
        ));

        Ok(Server {
            addr: bound_addr,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and close open connections
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop<S: Store + 'static>(
    listener: TcpListener,
    shared: Arc<Shared<S>>,
    permits: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        match permits.clone().try_acquire_owned() {
                            Ok(permit) => {
                                tokio::spawn(handle_connection(
                                    stream,
                                    addr,
                                    shared.clone(),
                                    permit,
                                    shutdown_tx.subscribe(),
                                ));
                            }
                            Err(_) => {
                                warn!(addr = %addr, "Connection limit reached");
                                tokio::spawn(turn_away(stream));
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Tell a client over the limit why it is being dropped
async fn turn_away(mut stream: TcpStream) {
    let reply = Envelope::new(Message::error(CODE_UNAVAILABLE, "Server is at capacity"));
    if let Err(e) = write_frame(&mut stream, &reply).await {
        debug!(error = %e, "Failed to send capacity rejection");
    }
}

/// Handle a single client connection
async fn handle_connection<S: Store + 'static>(
    stream: TcpStream,
    addr: SocketAddr,
    shared: Arc<Shared<S>>,
    _permit: OwnedSemaphorePermit,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        tokio::select! {
            result = serve_one(&mut reader, &mut writer, addr, &shared) => {
                match result {
                    Ok(()) => {}
                    Err(Error::ConnectionClosed) => {
                        debug!(addr = %addr, "Connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(addr = %addr, error = %e, "Connection error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                debug!(addr = %addr, "Closing connection for shutdown");
                break;
            }
        }
    }
}

/// Read one request and write its reply
async fn serve_one<R, W, S>(
    reader: &mut R,
    writer: &mut W,
    addr: SocketAddr,
    shared: &Arc<Shared<S>>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Store + 'static,
{
    let request: Envelope = match read_frame(reader).await {
        Ok(envelope) => envelope,
        Err(Error::Malformed(reason)) => {
            debug!(addr = %addr, reason = %reason, "Malformed request");
            let reply = Envelope::new(Message::error(CODE_BAD_REQUEST, reason));
            return write_frame(writer, &reply).await;
        }
        Err(e) => return Err(e),
    };

    let body = dispatch(shared, addr, request.body.clone()).await;
    write_frame(writer, &request.reply(body)).await
}

/// Run a request against the engine and build the reply body
async fn dispatch<S: Store + 'static>(
    shared: &Arc<Shared<S>>,
    addr: SocketAddr,
    request: Message,
) -> Message {
    match request {
        Message::Ping => return Message::Pong,
        ref other if !other.is_request() => {
            return Message::error(CODE_BAD_REQUEST, "Expected a request message");
        }
        _ => {}
    }

    let shared_for_call = shared.clone();
    let call = tokio::task::spawn_blocking(move || execute(&shared_for_call, addr, request));

    match tokio::time::timeout(shared.request_timeout, call).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(join_err)) => {
            error!(error = %join_err, "Request task failed");
            Message::error(CODE_INTERNAL, "Request failed")
        }
        Err(_) => {
            // The blocking call keeps running; its outcome is unknown to the caller
            warn!(addr = %addr, "Request timed out");
            Message::error(CODE_TIMEOUT, "Request timed out; outcome unknown")
        }
    }
}

/// Map one request onto the engine
fn execute<S: Store>(shared: &Shared<S>, addr: SocketAddr, request: Message) -> Message {
    let engine = &shared.engine;
    let outcome = match request {
        Message::ListPolls { status } => engine.list_polls(status).map(|polls| Message::Polls {
            count: polls.len(),
            polls,
        }),
        Message::GetPoll { id } => engine.get_poll(&id).map(|poll| Message::Poll { poll }),
        Message::CreatePoll {
            question,
            options,
            expires_at,
        } => engine
            .create_poll(NewPoll {
                question,
                options,
                expires_at,
            })
            .map(|poll| Message::Poll { poll }),
        Message::CastVote {
            poll_id,
            voter_id,
            option_index,
        } => {
            let voter_id = voter_id.unwrap_or_else(|| peer_voter_id(addr));
            debug!(poll_id = %poll_id, voter_id = %voter_id, option_index, "Vote attempt");
            engine
                .cast_vote(&poll_id, &voter_id, option_index)
                .map(|poll| Message::Poll { poll })
        }
        Message::HasVoted { poll_id, voter_id } => {
            let voter_id = voter_id.unwrap_or_else(|| peer_voter_id(addr));
            engine
                .has_voted(&poll_id, &voter_id)
                .map(|status| Message::VoteStatus {
                    has_voted: status.has_voted,
                    option_index: status.option_index,
                })
        }
        Message::DeletePoll { id } => engine.delete_poll(&id).map(|()| Message::Deleted { id }),
        Message::PollStats { id } => engine.poll_stats(&id).map(|stats| Message::Stats { stats }),
        Message::Health => engine
            .list_polls(Default::default())
            .map(|polls| Message::HealthReport {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_secs: shared.started.elapsed().as_secs(),
                poll_count: polls.len(),
            }),
        _ => return Message::error(CODE_BAD_REQUEST, "Expected a request message"),
    };

    outcome.unwrap_or_else(|e| {
        if e.kind() == tally_core::ErrorKind::Storage {
            error!(error = %e, "Storage failure");
        }
        Message::from_core_error(&e)
    })
}

/// Fallback identity for clients that do not name themselves
fn peer_voter_id(addr: SocketAddr) -> String {
    addr.ip().to_string()
}
