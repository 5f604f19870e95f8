//! Action item model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Progress of an action item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionItemStatus {
    /// Not yet picked up.
    Open,
    /// Someone is working on it.
    InProgress,
    /// Finished.
    Done,
}

/// Relative urgency of an action item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Default urgency.
    Medium,
    /// Needs attention first.
    High,
}

impl ActionItemStatus {
    /// Column representation used by the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// Parse the column representation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for unknown values.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(AppError::Db(format!("invalid action item status: {other}"))),
        }
    }
}

impl Priority {
    /// Column representation used by the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the column representation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for unknown values.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(AppError::Db(format!("invalid priority: {other}"))),
        }
    }
}

/// A follow-up task produced during a meeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    /// Unique record identifier.
    pub id: String,
    /// Owning meeting.
    pub meeting_id: String,
    /// Short description.
    pub title: String,
    /// Current progress.
    pub status: ActionItemStatus,
    /// Persona or person responsible.
    pub assignee: Option<String>,
    /// Target completion date.
    pub due_date: Option<NaiveDate>,
    /// Relative urgency.
    pub priority: Priority,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ActionItem {
    /// Construct a new open action item with a generated identifier.
    #[must_use]
    pub fn new(meeting_id: String, title: String, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            meeting_id,
            title,
            status: ActionItemStatus::Open,
            assignee: None,
            due_date: None,
            priority,
            created_at: Utc::now(),
        }
    }
}
