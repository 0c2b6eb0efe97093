use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::http::connection::Connection;
use crate::server::dispatcher::Dispatcher;
use crate::server::tls::Handshake;

/// Pause after a failed accept, so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Source of accepted sockets.
pub trait Incoming {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Incoming for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accept loop: accept, handshake, hand off to a worker slot.
///
/// Returns `Ok` when `shutdown` resolves and `Err` when a connection cannot
/// be handed to a worker. Accept errors are never fatal; the loop backs off
/// and tries again. Either way nothing new is accepted after returning.
pub async fn run<L, H, F>(
    listener: &L,
    handshake: &H,
    dispatcher: &mut Dispatcher<H::Stream>,
    handshake_timeout: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    L: Incoming,
    H: Handshake,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                return Ok(());
            }
        };

        let (socket, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection, backing off");
                tokio::select! {
                    _ = sleep(ACCEPT_BACKOFF) => continue,
                    _ = &mut shutdown => {
                        info!("Shutdown signal received");
                        return Ok(());
                    }
                }
            }
        };
        debug!(%peer, "Accepted connection");

        let stream = match timeout(handshake_timeout, handshake.handshake(socket)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(%peer, error = %e, "TLS handshake failed");
                continue;
            }
            Err(_) => {
                warn!(%peer, "TLS handshake timed out");
                continue;
            }
        };

        tokio::select! {
            placed = dispatcher.dispatch(Connection::new(stream, peer)) => {
                let slot = placed.context("failed to hand connection to a worker")?;
                debug!(%peer, slot, "Connection assigned");
            }
            _ = &mut shutdown => {
                info!(%peer, "Shutdown signal received while waiting for a free worker");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use crate::files::{DocumentRoot, Router};
    use crate::http::connection::SessionConfig;
    use crate::server::{Plaintext, ServerContext, WorkerPool};

    /// Fails the first `failures` accepts the way descriptor exhaustion does.
    struct Exhausted {
        inner: TcpListener,
        failures: AtomicUsize,
    }

    impl Incoming for Exhausted {
        async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
            if self
                .failures
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(io::Error::other("Too many open files (os error 24)"));
            }
            self.inner.accept().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn accept_errors_back_off_and_keep_serving() {
        let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = inner.local_addr().unwrap();
        let listener = Exhausted {
            inner,
            failures: AtomicUsize::new(3),
        };

        let context = Arc::new(ServerContext {
            router: Router::new(DocumentRoot::new(std::env::temp_dir().join("warden-empty"))),
            session: SessionConfig::default(),
        });
        let (mut dispatcher, pool) = WorkerPool::spawn::<TcpStream>(1, context);
        let (stop, stopped) = oneshot::channel::<()>();

        let acceptor = tokio::spawn(async move {
            let result = run(
                &listener,
                &Plaintext,
                &mut dispatcher,
                Duration::from_secs(1),
                async {
                    let _ = stopped.await;
                },
            )
            .await;
            drop(dispatcher);
            pool.join().await;
            (result, listener.failures.load(Ordering::Acquire))
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /missing HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

        stop.send(()).unwrap();
        let (result, failures_left) = acceptor.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(failures_left, 0);
    }
}
