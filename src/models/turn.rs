//! Persona turn model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured content of one persona contribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnContent {
    /// One-paragraph summary of the contribution.
    pub summary: String,
    /// Risks raised by the persona.
    pub risks: Vec<String>,
    /// Opportunities raised by the persona.
    pub opportunities: Vec<String>,
    /// Concrete recommendations.
    pub recommendations: Vec<String>,
    /// Unstructured text as produced by the composer.
    pub raw_content: String,
    /// Optional per-turn metrics.
    pub metrics: Option<serde_json::Value>,
}

/// One persona's contribution to a meeting. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonaTurn {
    /// Owning meeting.
    pub meeting_id: String,
    /// Strictly increasing position within the meeting, starting at 1.
    pub sequence: i64,
    /// Persona that produced the turn.
    pub persona_id: String,
    /// Agenda section the turn belongs to, if any.
    pub section_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Structured content.
    #[serde(flatten)]
    pub content: TurnContent,
}
