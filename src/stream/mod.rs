//! Live meeting streaming core.
//!
//! A [`session::StreamSession`] owns one client connection and two
//! periodic tasks: the poll task drives the [`sync::Synchronizer`] and the
//! heartbeat task keeps idle proxies from recycling the connection. All
//! termination paths converge on [`lifecycle::Lifecycle::close`].

pub mod event;
pub mod lifecycle;
pub mod session;
pub mod sync;
pub mod writer;

pub use event::{EventType, StreamEvent, HEARTBEAT_FRAME};
pub use lifecycle::{CloseReason, Lifecycle};
pub use session::{SessionSettings, SessionState, StreamSession};
pub use sync::{Snapshot, SyncState, Synchronizer, Termination, TickOutcome, TickOutput};
pub use writer::FrameWriter;
