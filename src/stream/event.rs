//! Protocol events and their `text/event-stream` framing.
//!
//! Every event is written as one `data: <JSON>\n\n` record with the shape
//! `{type, data, timestamp}`. Heartbeats are comment lines and never parse
//! as events.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::action_item::ActionItem;
use crate::models::agenda::AgendaSection;
use crate::models::turn::PersonaTurn;
use crate::{AppError, Result};

/// Keep-alive comment frame.
pub const HEARTBEAT_FRAME: &[u8] = b": keep-alive\n\n";

/// Discriminator written in the `type` field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// An agenda section's status as last observed.
    Agenda,
    /// One persona turn.
    PersonaResponse,
    /// A newly seen action item.
    ActionItem,
    /// Outcome summary.
    Summary,
    /// Metrics blob.
    Metrics,
    /// The meeting ended.
    Completed,
    /// The session failed.
    Error,
}

/// One protocol event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEvent {
    /// Event discriminator.
    #[serde(rename = "type")]
    pub kind: EventType,
    /// Event payload.
    pub data: Value,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    fn now(kind: EventType, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Status of one agenda section.
    #[must_use]
    pub fn agenda(meeting_id: &str, section: &AgendaSection) -> Self {
        Self::now(
            EventType::Agenda,
            json!({
                "meetingId": meeting_id,
                "sectionId": section.id,
                "title": section.title,
                "personaId": section.persona_id,
                "dependsOn": section.depends_on,
                "status": section.status,
            }),
        )
    }

    /// One persona turn, with its sequence number.
    #[must_use]
    pub fn persona_response(turn: &PersonaTurn) -> Self {
        Self::now(EventType::PersonaResponse, json!(turn))
    }

    /// A newly seen action item.
    #[must_use]
    pub fn action_item(item: &ActionItem) -> Self {
        Self::now(EventType::ActionItem, json!(item))
    }

    /// Outcome summary.
    #[must_use]
    pub fn summary(meeting_id: &str, summary: &str) -> Self {
        Self::now(
            EventType::Summary,
            json!({ "meetingId": meeting_id, "summary": summary }),
        )
    }

    /// Metrics blob.
    #[must_use]
    pub fn metrics(meeting_id: &str, metrics: &Value) -> Self {
        Self::now(
            EventType::Metrics,
            json!({ "meetingId": meeting_id, "metrics": metrics }),
        )
    }

    /// Meeting ended at `ended_at`.
    #[must_use]
    pub fn completed(meeting_id: &str, ended_at: DateTime<Utc>) -> Self {
        Self::now(
            EventType::Completed,
            json!({ "meetingId": meeting_id, "endedAt": ended_at }),
        )
    }

    /// Session failure with a human-readable message.
    #[must_use]
    pub fn error(meeting_id: &str, message: &str) -> Self {
        Self::now(
            EventType::Error,
            json!({ "meetingId": meeting_id, "message": message }),
        )
    }

    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventType::Completed | EventType::Error)
    }

    /// Encode as a `data:` frame.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` if the payload cannot be serialized.
    pub fn to_frame(&self) -> Result<Bytes> {
        let json = serde_json::to_string(self)
            .map_err(|err| AppError::Stream(format!("failed to encode event: {err}")))?;
        Ok(Bytes::from(format!("data: {json}\n\n")))
    }
}
