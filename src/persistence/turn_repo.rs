//! Persona turn repository for `SQLite` persistence.

use std::sync::Arc;

use crate::models::turn::{PersonaTurn, TurnContent};
use crate::{AppError, Result};

use super::db::Database;
use super::{format_ts, parse_ts};

/// Repository wrapper around `SQLite` for append-only persona turns.
#[derive(Clone)]
pub struct TurnRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TurnRow {
    meeting_id: String,
    sequence: i64,
    persona_id: String,
    section_id: Option<String>,
    summary: String,
    risks: String,
    opportunities: String,
    recommendations: String,
    raw_content: String,
    metrics: Option<String>,
    created_at: String,
}

impl TurnRow {
    /// Convert a database row into the domain model.
    fn into_turn(self) -> Result<PersonaTurn> {
        let list = |column: &str, raw: &str| -> Result<Vec<String>> {
            serde_json::from_str(raw).map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
        };
        let metrics = self
            .metrics
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid metrics: {e}")))?;

        Ok(PersonaTurn {
            created_at: parse_ts("created_at", &self.created_at)?,
            content: TurnContent {
                risks: list("risks", &self.risks)?,
                opportunities: list("opportunities", &self.opportunities)?,
                recommendations: list("recommendations", &self.recommendations)?,
                summary: self.summary,
                raw_content: self.raw_content,
                metrics,
            },
            meeting_id: self.meeting_id,
            sequence: self.sequence,
            persona_id: self.persona_id,
            section_id: self.section_id,
        })
    }
}

impl TurnRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a turn. Sequence numbers are unique per meeting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails, including a reused sequence.
    pub async fn append(&self, turn: &PersonaTurn) -> Result<PersonaTurn> {
        let content = &turn.content;
        let json = |value: &Vec<String>| {
            serde_json::to_string(value).map_err(|e| AppError::Db(format!("serialize turn: {e}")))
        };
        let metrics = content
            .metrics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Db(format!("serialize turn metrics: {e}")))?;

        sqlx::query(
            "INSERT INTO persona_turn (meeting_id, sequence, persona_id, section_id,
             summary, risks, opportunities, recommendations, raw_content, metrics, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&turn.meeting_id)
        .bind(turn.sequence)
        .bind(&turn.persona_id)
        .bind(&turn.section_id)
        .bind(&content.summary)
        .bind(json(&content.risks)?)
        .bind(json(&content.opportunities)?)
        .bind(json(&content.recommendations)?)
        .bind(&content.raw_content)
        .bind(&metrics)
        .bind(format_ts(turn.created_at))
        .execute(self.db.as_ref())
        .await?;

        Ok(turn.clone())
    }

    /// Next free sequence number for a meeting (1 for the first turn).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn next_sequence(&self, meeting_id: &str) -> Result<i64> {
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM persona_turn WHERE meeting_id = ?1",
        )
        .bind(meeting_id)
        .fetch_one(self.db.as_ref())
        .await?;
        Ok(next)
    }

    /// List turns with a sequence strictly greater than `after`, ascending.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn list_after(&self, meeting_id: &str, after: i64) -> Result<Vec<PersonaTurn>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT * FROM persona_turn WHERE meeting_id = ?1 AND sequence > ?2 \
             ORDER BY sequence ASC",
        )
        .bind(meeting_id)
        .bind(after)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(TurnRow::into_turn).collect()
    }

    /// Count turns recorded for a meeting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_for_meeting(&self, meeting_id: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM persona_turn WHERE meeting_id = ?1")
                .bind(meeting_id)
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }
}
