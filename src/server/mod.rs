//! Acceptor, dispatcher and worker pool.
//!
//! One accept loop hands each established channel to one of N workers
//! through single-item slots. Workers run keep-alive sessions to completion
//! before taking the next connection.

pub mod dispatcher;
pub mod listener;
pub mod tls;
pub mod worker;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::files::{DocumentRoot, Router};
use crate::http::connection::SessionConfig;

pub use dispatcher::{DispatchError, Dispatcher, Slot};
pub use tls::{Handshake, Plaintext};
pub use worker::{WorkerPool, WorkerState, WorkerStatus};

/// State shared read-only by every worker.
#[derive(Debug)]
pub struct ServerContext {
    pub router: Router,
    pub session: SessionConfig,
}

pub struct Server<H> {
    config: ServerConfig,
    handshake: H,
    context: Arc<ServerContext>,
}

impl<H: Handshake> Server<H> {
    /// Fails if the document root is not an existing directory.
    pub fn new(config: ServerConfig, handshake: H) -> anyhow::Result<Self> {
        let root = DocumentRoot::open(&config.home)
            .with_context(|| format!("invalid document root {}", config.home.display()))?;

        let context = Arc::new(ServerContext {
            router: Router::new(root),
            session: config.session(),
        });

        Ok(Self {
            config,
            handshake,
            context,
        })
    }

    /// Serve on `listener` until `shutdown` resolves or the accept loop
    /// fails, then let every worker finish its session.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, workers = self.config.threads, "Listening");
        }

        let (mut dispatcher, pool) =
            WorkerPool::spawn::<H::Stream>(self.config.threads, self.context.clone());

        let result = listener::run(
            &listener,
            &self.handshake,
            &mut dispatcher,
            self.config.handshake_timeout(),
            shutdown,
        )
        .await;

        if let Err(e) = &result {
            tracing::error!(error = %format!("{e:#}"), "Accept loop stopped");
        }

        // Closing the slots lets idle workers exit; busy ones finish first
        drop(dispatcher);
        drop(listener);
        pool.join().await;
        tracing::info!("All workers stopped");

        result
    }
}
