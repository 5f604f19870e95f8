//! Per-connection stream session.
//!
//! Opening a session spawns two tasks against one frame channel:
//!
//! - the poll task writes the initial agenda snapshot, then runs the
//!   [`Synchronizer`] on a fixed interval and writes whatever it returns;
//! - the heartbeat task writes a keep-alive comment on its own interval.
//!
//! Both tasks race every await against the session's cancellation token and
//! the client's disconnect, and every exit path goes through
//! [`Lifecycle::close`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::event::{StreamEvent, HEARTBEAT_FRAME};
use super::lifecycle::{CloseReason, Lifecycle};
use super::sync::{Synchronizer, Termination, TickOutcome};
use super::writer::FrameWriter;
use crate::config::StreamConfig;

/// Message sent when the synchronizer cannot read meeting state.
pub const SYNC_FAILURE_MESSAGE: &str = "meeting state could not be read";

/// Message sent when the maximum session lifetime elapses.
pub const EXPIRED_MESSAGE: &str = "meeting stream exceeded maximum duration";

/// Protocol state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Headers committed, initial snapshot being written.
    Starting,
    /// Poll task running.
    Streaming,
    /// Closed after `completed`.
    Completed,
    /// Closed after an `error` event.
    Errored,
    /// Closed because the client went away.
    ClientClosed,
    /// Closed by server shutdown.
    ShutDown,
}

impl From<CloseReason> for SessionState {
    fn from(reason: CloseReason) -> Self {
        match reason {
            CloseReason::Completed => Self::Completed,
            CloseReason::WorkerFailed
            | CloseReason::SyncFailed
            | CloseReason::StartFailed
            | CloseReason::Expired => Self::Errored,
            CloseReason::ClientDisconnected => Self::ClientClosed,
            CloseReason::Shutdown => Self::ShutDown,
        }
    }
}

/// Timing and buffering for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Interval between synchronizer ticks.
    pub poll_interval: Duration,
    /// Interval between keep-alive frames.
    pub heartbeat_interval: Duration,
    /// Optional upper bound on the session's lifetime.
    pub max_session: Option<Duration>,
    /// Frame channel capacity.
    pub channel_capacity: usize,
}

impl From<&StreamConfig> for SessionSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            heartbeat_interval: config.heartbeat_interval(),
            max_session: config.max_session(),
            channel_capacity: config.channel_capacity,
        }
    }
}

struct Shared {
    meeting_id: String,
    lifecycle: Lifecycle,
    state: Mutex<SessionState>,
}

impl Shared {
    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn finish(&self, reason: CloseReason) {
        if self.lifecycle.close(reason) {
            if reason.is_error() {
                warn!(meeting_id = %self.meeting_id, ?reason, "stream session closed");
            } else {
                info!(meeting_id = %self.meeting_id, ?reason, "stream session closed");
            }
        }
    }

    /// Write one frame. Returns `false` once the session can no longer write.
    async fn write(&self, frame: Bytes) -> bool {
        let cancel = self.lifecycle.cancel_token();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                self.finish(CloseReason::Shutdown);
                false
            }
            result = self.lifecycle.writer().send(frame) => match result {
                Ok(()) => true,
                Err(err) => {
                    debug!(%err, "frame write failed");
                    self.finish(CloseReason::ClientDisconnected);
                    false
                }
            }
        }
    }

    async fn emit(&self, event: &StreamEvent) -> bool {
        match event.to_frame() {
            Ok(frame) => self.write(frame).await,
            Err(err) => {
                error!(%err, kind = ?event.kind, "dropping unencodable event");
                true
            }
        }
    }
}

/// Handle to a running stream session.
///
/// Dropping the handle does not close the session; its tasks run until a
/// termination path closes it.
#[derive(Clone)]
pub struct StreamSession {
    shared: Arc<Shared>,
}

impl StreamSession {
    /// Open a session and start its tasks.
    ///
    /// `initial` is written before the first poll tick. `shutdown` is the
    /// server-wide token; cancelling it closes the session.
    ///
    /// Returns the handle and the receiver backing the response body.
    #[must_use]
    pub fn open(
        synchronizer: Synchronizer,
        initial: Vec<StreamEvent>,
        settings: SessionSettings,
        shutdown: &CancellationToken,
    ) -> (Self, mpsc::Receiver<Bytes>) {
        let meeting_id = synchronizer.meeting_id().to_owned();
        let (writer, rx) = FrameWriter::channel(settings.channel_capacity);
        let session = Self::from_parts(meeting_id.clone(), writer, shutdown.child_token());

        let heartbeat = tokio::spawn(
            run_heartbeat(Arc::clone(&session.shared), settings.heartbeat_interval)
                .instrument(info_span!("stream_heartbeat", meeting_id = %meeting_id)),
        );
        session.shared.lifecycle.arm(heartbeat.abort_handle());

        let poll = tokio::spawn(
            run_poll(Arc::clone(&session.shared), synchronizer, initial, settings)
                .instrument(info_span!("stream_session", meeting_id = %meeting_id)),
        );
        session.shared.lifecycle.arm(poll.abort_handle());

        info!(meeting_id = %meeting_id, "stream session opened");
        (session, rx)
    }

    /// A session that carries a single `error` event and is already closed.
    ///
    /// Used when the meeting cannot be created or enqueued after validation
    /// succeeded; failures past that point are always reported in-band.
    #[must_use]
    pub fn failed(meeting_id: &str, message: &str) -> (Self, mpsc::Receiver<Bytes>) {
        let (writer, rx) = FrameWriter::channel(1);
        let session = Self::from_parts(meeting_id.to_owned(), writer, CancellationToken::new());

        match StreamEvent::error(meeting_id, message).to_frame() {
            Ok(frame) => {
                if let Err(err) = session.shared.lifecycle.writer().try_send(frame) {
                    error!(%err, meeting_id, "failed to queue start error");
                }
            }
            Err(err) => error!(%err, meeting_id, "failed to encode start error"),
        }

        session.shared.finish(CloseReason::StartFailed);
        (session, rx)
    }

    fn from_parts(meeting_id: String, writer: FrameWriter, cancel: CancellationToken) -> Self {
        Self {
            shared: Arc::new(Shared {
                meeting_id,
                lifecycle: Lifecycle::new(writer, cancel),
                state: Mutex::new(SessionState::Starting),
            }),
        }
    }

    /// Meeting this session streams.
    #[must_use]
    pub fn meeting_id(&self) -> &str {
        &self.shared.meeting_id
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.shared.lifecycle.reason() {
            Some(reason) => reason.into(),
            None => *self
                .shared
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Reason the session closed, if it has.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.shared.lifecycle.reason()
    }

    /// Whether the session has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.lifecycle.is_closed()
    }

    /// Whether both periodic tasks have stopped.
    #[must_use]
    pub fn timers_finished(&self) -> bool {
        self.shared.lifecycle.timers_finished()
    }

    /// Close the session from outside. Returns `true` if this call closed it.
    pub fn close(&self, reason: CloseReason) -> bool {
        self.shared.lifecycle.close(reason)
    }

    /// Wait until the session has closed.
    pub async fn closed(&self) {
        self.shared.lifecycle.cancel_token().cancelled().await;
    }
}

async fn run_heartbeat(shared: Arc<Shared>, period: Duration) {
    let cancel = shared.lifecycle.cancel_token().clone();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !shared.write(Bytes::from_static(HEARTBEAT_FRAME)).await {
                    break;
                }
                debug!("heartbeat sent");
            }
        }
    }
    shared.finish(CloseReason::Shutdown);
}

async fn run_poll(
    shared: Arc<Shared>,
    synchronizer: Synchronizer,
    initial: Vec<StreamEvent>,
    settings: SessionSettings,
) {
    let cancel = shared.lifecycle.cancel_token().clone();

    // ── Starting: initial agenda snapshot ───────────────
    for event in &initial {
        if !shared.emit(event).await {
            return;
        }
    }

    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let deadline = settings.max_session.map(|limit| Instant::now() + limit);
    shared.set_state(SessionState::Streaming);

    // ── Streaming ───────────────────────────────────────
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = shared.lifecycle.writer().peer_closed() => {
                shared.finish(CloseReason::ClientDisconnected);
                break;
            }
            () = expire(deadline) => {
                shared.emit(&StreamEvent::error(&shared.meeting_id, EXPIRED_MESSAGE)).await;
                shared.finish(CloseReason::Expired);
                break;
            }
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = shared.lifecycle.writer().peer_closed() => {
                shared.finish(CloseReason::ClientDisconnected);
                break;
            }
            outcome = synchronizer.try_tick() => outcome,
        };

        match outcome {
            Ok(TickOutcome::Skipped) => {}
            Ok(TickOutcome::Ran(output)) => {
                for event in &output.events {
                    if !shared.emit(event).await {
                        return;
                    }
                }
                if let Some(termination) = output.termination {
                    shared.finish(match termination {
                        Termination::Completed => CloseReason::Completed,
                        Termination::WorkerFailed { .. } => CloseReason::WorkerFailed,
                    });
                    break;
                }
            }
            Err(err) => {
                error!(%err, "synchronizer tick failed");
                shared
                    .emit(&StreamEvent::error(&shared.meeting_id, SYNC_FAILURE_MESSAGE))
                    .await;
                shared.finish(CloseReason::SyncFailed);
                break;
            }
        }
    }
    shared.finish(CloseReason::Shutdown);
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
