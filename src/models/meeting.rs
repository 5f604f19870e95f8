//! Meeting model and lifecycle helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agenda::AgendaSection;
use crate::{AppError, Result};

/// Overall meeting status recorded in metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    /// Worker is still producing content.
    Running,
    /// Worker finished and set `ended_at`.
    Completed,
    /// Worker gave up on the meeting.
    Failed,
}

impl MeetingStatus {
    /// Column representation used by the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the column representation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for unknown values.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::Db(format!("invalid meeting status: {other}"))),
        }
    }
}

/// Meeting aggregate as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Unique record identifier.
    pub id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set exactly once by the worker when the meeting finishes.
    pub ended_at: Option<DateTime<Utc>>,
    /// Metadata status.
    pub status: MeetingStatus,
    /// Caller that requested the meeting, if known.
    pub requested_by: Option<String>,
    /// Agenda format version supplied by the caller.
    pub agenda_version: Option<u8>,
    /// Outcome summary written by the worker.
    pub summary: Option<String>,
    /// Free-form metrics written by the worker.
    pub metrics: Option<serde_json::Value>,
    /// Ordered agenda sections with their current status.
    pub agenda: Vec<AgendaSection>,
}

impl Meeting {
    /// Construct a new running meeting with a generated identifier.
    #[must_use]
    pub fn new(
        requested_by: Option<String>,
        agenda_version: Option<u8>,
        agenda: Vec<AgendaSection>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            ended_at: None,
            status: MeetingStatus::Running,
            requested_by,
            agenda_version,
            summary: None,
            metrics: None,
            agenda,
        }
    }

    /// Whether the worker has finished the meeting.
    #[must_use]
    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}
