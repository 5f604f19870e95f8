//! Exactly-once teardown of a stream session.
//!
//! Any of the termination paths (completion, worker failure, synchronizer
//! failure, client disconnect, expiry, server shutdown) may call
//! [`Lifecycle::close`], possibly at the same time. The first call wins the
//! `closed` flag and performs every side effect; later calls are no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use super::writer::FrameWriter;

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The meeting ended and `completed` was sent.
    Completed,
    /// The worker reported failure and `error` was sent.
    WorkerFailed,
    /// The synchronizer could not read meeting state and `error` was sent.
    SyncFailed,
    /// The meeting could not be created or enqueued and `error` was sent.
    StartFailed,
    /// The maximum session lifetime elapsed and `error` was sent.
    Expired,
    /// The client went away; nothing was sent.
    ClientDisconnected,
    /// The server is shutting down; nothing was sent.
    Shutdown,
}

impl CloseReason {
    /// Whether the close reflects a failure the client was told about.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::WorkerFailed | Self::SyncFailed | Self::StartFailed | Self::Expired
        )
    }
}

/// Owns the closable resources of one session.
#[derive(Debug)]
pub struct Lifecycle {
    closed: AtomicBool,
    reason: OnceLock<CloseReason>,
    cancel: CancellationToken,
    timers: Mutex<Vec<AbortHandle>>,
    writer: FrameWriter,
}

impl Lifecycle {
    /// Wrap a connection writer; `cancel` is cancelled on close.
    #[must_use]
    pub fn new(writer: FrameWriter, cancel: CancellationToken) -> Self {
        Self {
            closed: AtomicBool::new(false),
            reason: OnceLock::new(),
            cancel,
            timers: Mutex::new(Vec::new()),
            writer,
        }
    }

    /// The session's connection writer.
    #[must_use]
    pub fn writer(&self) -> &FrameWriter {
        &self.writer
    }

    /// Token cancelled when the session closes (or the server shuts down).
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Register a periodic task to be aborted on close.
    ///
    /// A task armed after close is aborted immediately.
    pub fn arm(&self, timer: AbortHandle) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::SeqCst) {
            timer.abort();
        }
        timers.push(timer);
    }

    /// Close the session.
    ///
    /// Returns `true` for the single call that performed the teardown:
    /// recording `reason`, cancelling the token, aborting armed tasks and
    /// ending the connection.
    pub fn close(&self, reason: CloseReason) -> bool {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let _ = self.reason.set(reason);
        self.cancel.cancel();
        for timer in self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            timer.abort();
        }
        self.writer.end();
        true
    }

    /// Whether [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Reason recorded by the winning [`close`](Self::close) call.
    #[must_use]
    pub fn reason(&self) -> Option<CloseReason> {
        self.reason.get().copied()
    }

    /// Whether every armed task has stopped.
    #[must_use]
    pub fn timers_finished(&self) -> bool {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .all(AbortHandle::is_finished)
    }
}
