//! Fixed pool of long-lived workers.
//!
//! ```text
//!   Idle ──(slot filled)──▶ Assigned ──(claimed)──▶ Serving
//!    ▲                                                 │
//!    └─────────────(session ended, channel shut)───────┘
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::http::connection::Connection;
use crate::server::ServerContext;
use crate::server::dispatcher::{Dispatcher, Slot};

const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the dispatcher to fill the slot
    Idle = 0,
    /// Connection taken out of the slot, slot free again
    Assigned = 1,
    /// Running request/response cycles
    Serving = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => WorkerState::Assigned,
            2 => WorkerState::Serving,
            _ => WorkerState::Idle,
        }
    }
}

/// A worker's published state, shared with the dispatcher and the pool.
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus(Arc<AtomicU8>);

impl WorkerStatus {
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// One worker: owns the receiving end of its slot.
pub struct Worker<S> {
    id: usize,
    slot: mpsc::Receiver<Connection<S>>,
    status: WorkerStatus,
    context: Arc<ServerContext>,
}

impl<S> Worker<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Serve connections until the slot is closed by the dispatcher.
    pub async fn run(mut self) {
        loop {
            self.status.set(WorkerState::Idle);

            let Some(mut conn) = self.slot.recv().await else {
                tracing::debug!(worker = self.id, "Slot closed, worker exiting");
                break;
            };
            self.status.set(WorkerState::Assigned);

            let peer = conn.peer();
            tracing::debug!(worker = self.id, %peer, "Claimed connection");

            self.status.set(WorkerState::Serving);
            if let Err(e) = conn
                .serve(&self.context.router, &self.context.session)
                .await
            {
                tracing::warn!(worker = self.id, %peer, error = %e, "Session ended with error");
            }

            conn.shutdown(SHUTDOWN_WAIT).await;
            tracing::debug!(worker = self.id, %peer, "Session closed");
        }
    }
}

/// Handles to the spawned workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    states: Vec<WorkerStatus>,
}

impl WorkerPool {
    /// Spawn `count` workers, each with its own single-item slot.
    ///
    /// Returns the dispatcher feeding those slots alongside the pool.
    pub fn spawn<S>(count: usize, context: Arc<ServerContext>) -> (Dispatcher<S>, WorkerPool)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut slots = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        let mut states = Vec::with_capacity(count);

        for id in 0..count {
            let (mailbox, rx) = mpsc::channel(1);
            let status = WorkerStatus::default();

            let worker = Worker {
                id,
                slot: rx,
                status: status.clone(),
                context: context.clone(),
            };

            slots.push(Slot {
                mailbox,
                status: status.clone(),
            });
            states.push(status);
            handles.push(tokio::spawn(worker.run()));
        }

        tracing::info!(workers = count, "Worker pool started");

        (Dispatcher::new(slots), WorkerPool { handles, states })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.states.iter().map(WorkerStatus::get).collect()
    }

    /// Wait for every worker to finish its current session and exit.
    ///
    /// Workers only exit once their slot is closed, so the dispatcher must
    /// have been dropped first.
    pub async fn join(self) {
        for (id, handle) in self.handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker = id, error = %e, "Worker terminated abnormally");
            }
        }
    }
}
