//! Agenda section model and status progression.

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Progress of a single agenda section.
///
/// Sections only ever move forward: `pending → in_progress → completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    /// Section has not been started by the worker.
    Pending,
    /// Worker is producing turns for this section.
    InProgress,
    /// Worker finished the section.
    Completed,
}

impl SectionStatus {
    /// Position of the status in the forward-only progression.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }

    /// Whether moving from `self` to `next` would go backwards.
    #[must_use]
    pub fn regresses_to(self, next: Self) -> bool {
        next.rank() < self.rank()
    }

    /// Column representation used by the store.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parse the column representation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` for unknown values.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(AppError::Db(format!("invalid section status: {other}"))),
        }
    }
}

/// A normalized agenda entry as handed to the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaEntry {
    /// Section identifier, unique within the meeting.
    pub id: String,
    /// Human-readable section title.
    pub title: String,
    /// Persona assigned to the section.
    pub persona_id: String,
    /// Section that should precede this one. Informational only.
    pub depends_on: Option<String>,
}

impl AgendaEntry {
    /// Annotate the entry with a status, producing a displayable section.
    #[must_use]
    pub fn with_status(&self, status: SectionStatus) -> AgendaSection {
        AgendaSection {
            id: self.id.clone(),
            title: self.title.clone(),
            persona_id: self.persona_id.clone(),
            depends_on: self.depends_on.clone(),
            status,
        }
    }
}

/// An agenda section together with its current status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaSection {
    /// Section identifier, unique within the meeting.
    pub id: String,
    /// Human-readable section title.
    pub title: String,
    /// Persona assigned to the section.
    pub persona_id: String,
    /// Section that should precede this one. Informational only.
    pub depends_on: Option<String>,
    /// Current progress.
    pub status: SectionStatus,
}
