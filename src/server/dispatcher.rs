//! Hands accepted connections to worker slots.
//!
//! Each slot is a single-item mailbox owned by one worker. A slot is empty
//! when its mailbox has room; the dispatcher reserves that room before the
//! connection moves, so a pending connection is never overwritten.
//!
//! An empty mailbox does not mean a free worker: a worker in the middle of
//! a keep-alive session has already claimed its connection. Slots whose
//! worker reports [`WorkerState::Idle`] are therefore tried first.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::http::connection::Connection;
use crate::server::worker::{WorkerState, WorkerStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no worker slots configured")]
    NoWorkers,

    #[error("worker {0} is no longer accepting connections")]
    WorkerGone(usize),
}

/// One worker's mailbox together with the state it publishes.
pub struct Slot<S> {
    pub mailbox: mpsc::Sender<Connection<S>>,
    pub status: WorkerStatus,
}

/// Round-robin placement of connections into worker slots.
pub struct Dispatcher<S> {
    slots: Vec<Slot<S>>,
    cursor: usize,
}

impl<S> Dispatcher<S> {
    pub fn new(slots: Vec<Slot<S>>) -> Self {
        Self { slots, cursor: 0 }
    }

    /// Index of the slot tried first by the next dispatch.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Place `conn` in a slot and return its index.
    ///
    /// Starting at the cursor, the first empty slot of an idle worker takes
    /// the connection. Without an idle worker, the first empty slot does.
    /// When every slot is occupied this waits until the slot under the cursor
    /// is cleared by its worker. The cursor then moves one past the slot used.
    ///
    /// A closed slot means its worker has terminated; the connection is
    /// dropped (closing the socket) and the error is fatal to the acceptor.
    pub async fn dispatch(&mut self, conn: Connection<S>) -> Result<usize, DispatchError> {
        let count = self.slots.len();
        if count == 0 {
            return Err(DispatchError::NoWorkers);
        }

        let conn = match self.place(conn, true)? {
            Ok(index) => return Ok(index),
            Err(conn) => conn,
        };
        let conn = match self.place(conn, false)? {
            Ok(index) => return Ok(index),
            Err(conn) => conn,
        };

        let index = self.cursor;
        tracing::debug!(slot = index, "All worker slots occupied, waiting");

        let permit = self.slots[index]
            .mailbox
            .reserve()
            .await
            .map_err(|_| DispatchError::WorkerGone(index))?;
        permit.send(conn);
        self.cursor = (index + 1) % count;

        Ok(index)
    }

    /// One scan from the cursor over the empty slots, optionally only those
    /// of idle workers. Hands the connection back when nothing fits.
    fn place(
        &mut self,
        conn: Connection<S>,
        idle_only: bool,
    ) -> Result<Result<usize, Connection<S>>, DispatchError> {
        let count = self.slots.len();

        for offset in 0..count {
            let index = (self.cursor + offset) % count;
            let slot = &self.slots[index];

            if idle_only && slot.status.get() != WorkerState::Idle {
                continue;
            }

            match slot.mailbox.try_reserve() {
                Ok(permit) => {
                    permit.send(conn);
                    self.cursor = (index + 1) % count;
                    return Ok(Ok(index));
                }
                Err(TrySendError::Full(())) => continue,
                Err(TrySendError::Closed(())) => return Err(DispatchError::WorkerGone(index)),
            }
        }

        Ok(Err(conn))
    }
}
