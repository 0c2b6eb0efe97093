use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::files::Router;
use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

const READ_CHUNK: usize = 4096;

/// Per-session limits shared by every worker.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest request (headers and body) accepted before answering 413
    pub max_request_bytes: usize,
    /// Bound on every single read or write of the session
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: 1024 * 1024,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// An accepted client session over an established secure channel.
///
/// Owned by the acceptor until it is placed in a worker slot, then by that
/// worker until the session ends and the channel is shut down.
pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

/// Result of waiting for the next request on a session.
enum ReadOutcome {
    Request(Request),
    /// The bytes could not become a request; answer and close.
    Rejected(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Runs request/response cycles until the client stops asking for
    /// keep-alive, closes, goes idle, or the channel fails.
    ///
    /// Cycles are strictly sequential: the next request is not parsed before
    /// the previous response has been written and flushed.
    pub async fn serve(&mut self, router: &Router, session: &SessionConfig) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => match self.read_request(session).await? {
                    ReadOutcome::Request(req) => {
                        self.state = ConnectionState::Processing(req);
                    }
                    ReadOutcome::Rejected(response) => {
                        tracing::warn!(
                            peer = %self.peer,
                            status = response.status.as_u16(),
                            "Rejected request, closing connection"
                        );
                        let writer = ResponseWriter::new(&response, false);
                        self.state = ConnectionState::Writing(writer, false);
                    }
                    ReadOutcome::Closed => {
                        self.state = ConnectionState::Closed;
                    }
                },

                ConnectionState::Processing(req) => {
                    let response = router.handle(req).await;
                    let keep_alive = req.keep_alive;

                    tracing::info!(
                        peer = %self.peer,
                        method = ?req.method,
                        path = %req.path,
                        status = response.status.as_u16(),
                        keep_alive,
                        "Request served"
                    );

                    let writer = ResponseWriter::new(&response, keep_alive);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    timeout(session.idle_timeout, writer.write_to_stream(&mut self.stream))
                        .await
                        .map_err(|_| anyhow::anyhow!("timed out writing response"))??;

                    if *keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Shuts the channel down (TLS close_notify), bounded by `wait`.
    pub async fn shutdown(mut self, wait: Duration) {
        match timeout(wait, self.stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(peer = %self.peer, error = %e, "Channel shutdown failed");
            }
            Err(_) => {
                tracing::debug!(peer = %self.peer, "Channel shutdown timed out");
            }
        }
    }

    async fn read_request(&mut self, session: &SessionConfig) -> anyhow::Result<ReadOutcome> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data → fall through to read
                }

                Err(ParseError::UnrecognizedMethod) => {
                    return Ok(ReadOutcome::Rejected(Response::not_implemented()));
                }

                Err(e) => {
                    tracing::debug!(peer = %self.peer, error = ?e, "Malformed request");
                    return Ok(ReadOutcome::Rejected(Response::bad_request()));
                }
            }

            if self.buffer.len() >= session.max_request_bytes {
                return Ok(ReadOutcome::Rejected(Response::payload_too_large()));
            }

            self.buffer.reserve(READ_CHUNK);
            let n = match timeout(session.idle_timeout, self.stream.read_buf(&mut self.buffer)).await
            {
                Ok(read) => read?,
                Err(_) => {
                    tracing::debug!(peer = %self.peer, "Session idle, closing");
                    return Ok(ReadOutcome::Closed);
                }
            };

            if n == 0 {
                // Client closed connection
                return Ok(ReadOutcome::Closed);
            }
        }
    }
}
