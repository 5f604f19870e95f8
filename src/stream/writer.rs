//! Sending half of a stream session's connection.
//!
//! Frames go into a bounded channel whose receiver backs the HTTP response
//! body. Ending the writer drops the only long-lived sender, so the body
//! finishes after the buffered frames are flushed.

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{AppError, Result};

/// Shared, endable frame sender.
#[derive(Debug)]
pub struct FrameWriter {
    tx: Mutex<Option<mpsc::Sender<Bytes>>>,
}

impl FrameWriter {
    /// Create a writer and the receiver the transport reads from.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn sender(&self) -> Option<mpsc::Sender<Bytes>> {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue one frame, waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` if the writer has been ended or the client
    /// dropped the connection.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        let tx = self
            .sender()
            .ok_or_else(|| AppError::Stream("stream already closed".into()))?;
        tx.send(frame)
            .await
            .map_err(|_| AppError::Stream("client disconnected".into()))
    }

    /// Queue one frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` if the writer has ended, the client is gone,
    /// or the buffer is full.
    pub fn try_send(&self, frame: Bytes) -> Result<()> {
        let tx = self
            .sender()
            .ok_or_else(|| AppError::Stream("stream already closed".into()))?;
        tx.try_send(frame)
            .map_err(|err| AppError::Stream(format!("frame not queued: {err}")))
    }

    /// Resolve once the client side of the connection is gone.
    ///
    /// Resolves immediately if the writer has already been ended.
    pub async fn peer_closed(&self) {
        if let Some(tx) = self.sender() {
            tx.closed().await;
        }
    }

    /// End the connection. Returns `true` only for the call that ended it.
    pub fn end(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Whether [`end`](Self::end) has been called.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
