//! Background worker interface and the in-process implementation.
//!
//! The stream session enqueues a meeting fire-and-forget and afterwards
//! only asks for the job status on each poll tick.

pub mod composer;
pub mod local;

use uuid::Uuid;

use crate::models::agenda::AgendaEntry;
use crate::store::BoxFuture;

/// Reference to an enqueued meeting job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    /// Worker-assigned job identifier.
    pub job_id: String,
    /// Meeting the job produces content for.
    pub meeting_id: String,
}

impl JobHandle {
    /// Create a handle with a fresh job identifier.
    #[must_use]
    pub fn new(meeting_id: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            meeting_id: meeting_id.into(),
        }
    }
}

/// Status reported by the worker for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Job is still producing content.
    Running,
    /// Job finished; the meeting's `ended_at` has been written.
    Completed,
    /// Job gave up.
    Failed {
        /// Worker-reported failure reason.
        reason: String,
    },
}

impl JobStatus {
    /// Whether the job will not change status again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Worker operations consumed by the streaming core.
pub trait MeetingWorker: Send + Sync {
    /// Start producing content for `meeting_id` following `agenda`.
    ///
    /// Returns as soon as the job is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Worker`](crate::AppError::Worker) if the job
    /// cannot be accepted.
    fn enqueue<'a>(&'a self, meeting_id: &'a str, agenda: &'a [AgendaEntry])
        -> BoxFuture<'a, JobHandle>;

    /// Report the current status of a previously enqueued job.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`](crate::AppError::NotFound) if the job
    /// is unknown to the worker.
    fn job_status<'a>(&'a self, job: &'a JobHandle) -> BoxFuture<'a, JobStatus>;
}
