//! Meeting and agenda section repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::agenda::{AgendaSection, SectionStatus};
use crate::models::meeting::{Meeting, MeetingStatus};
use crate::{AppError, Result};

use super::db::Database;
use super::{format_ts, parse_ts};

/// Repository wrapper around `SQLite` for meeting records and their agenda.
#[derive(Clone)]
pub struct MeetingRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct MeetingRow {
    id: String,
    status: String,
    requested_by: Option<String>,
    agenda_version: Option<i64>,
    summary: Option<String>,
    metrics: Option<String>,
    created_at: String,
    ended_at: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SectionRow {
    id: String,
    title: String,
    persona_id: String,
    depends_on: Option<String>,
    status: String,
}

impl MeetingRow {
    /// Convert a database row plus its sections into the domain model.
    fn into_meeting(self, agenda: Vec<AgendaSection>) -> Result<Meeting> {
        let status = MeetingStatus::parse(&self.status)?;
        let created_at = parse_ts("created_at", &self.created_at)?;
        let ended_at = self
            .ended_at
            .as_deref()
            .map(|raw| parse_ts("ended_at", raw))
            .transpose()?;
        let agenda_version = self
            .agenda_version
            .map(u8::try_from)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid agenda_version: {e}")))?;
        let metrics = self
            .metrics
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid metrics: {e}")))?;

        Ok(Meeting {
            id: self.id,
            created_at,
            ended_at,
            status,
            requested_by: self.requested_by,
            agenda_version,
            summary: self.summary,
            metrics,
            agenda,
        })
    }
}

impl SectionRow {
    fn into_section(self) -> Result<AgendaSection> {
        Ok(AgendaSection {
            status: SectionStatus::parse(&self.status)?,
            id: self.id,
            title: self.title,
            persona_id: self.persona_id,
            depends_on: self.depends_on,
        })
    }
}

impl MeetingRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a meeting together with its ordered agenda.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails, including duplicate
    /// section ids within the agenda.
    pub async fn create(&self, meeting: &Meeting) -> Result<Meeting> {
        let metrics = meeting
            .metrics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Db(format!("serialize metrics: {e}")))?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO meeting (id, status, requested_by, agenda_version, summary,
             metrics, created_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&meeting.id)
        .bind(meeting.status.as_str())
        .bind(&meeting.requested_by)
        .bind(meeting.agenda_version.map(i64::from))
        .bind(&meeting.summary)
        .bind(&metrics)
        .bind(format_ts(meeting.created_at))
        .bind(meeting.ended_at.map(format_ts))
        .execute(&mut *tx)
        .await?;

        for (position, section) in meeting.agenda.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|e| AppError::Db(format!("agenda position overflow: {e}")))?;
            sqlx::query(
                "INSERT INTO agenda_section (meeting_id, id, position, title, persona_id,
                 depends_on, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&meeting.id)
            .bind(&section.id)
            .bind(position)
            .bind(&section.title)
            .bind(&section.persona_id)
            .bind(&section.depends_on)
            .bind(section.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(meeting.clone())
    }

    /// Retrieve a meeting and its agenda by identifier.
    ///
    /// Returns `Ok(None)` if the meeting does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Meeting>> {
        let row: Option<MeetingRow> = sqlx::query_as("SELECT * FROM meeting WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sections: Vec<SectionRow> = sqlx::query_as(
            "SELECT id, title, persona_id, depends_on, status FROM agenda_section \
             WHERE meeting_id = ?1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(self.db.as_ref())
        .await?;

        let agenda = sections
            .into_iter()
            .map(SectionRow::into_section)
            .collect::<Result<Vec<_>>>()?;

        row.into_meeting(agenda).map(Some)
    }

    /// Move an agenda section forward to `status`.
    ///
    /// Setting the current status again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the section does not exist, or
    /// `AppError::Db` if the transition would move the section backwards.
    pub async fn update_section_status(
        &self,
        meeting_id: &str,
        section_id: &str,
        status: SectionStatus,
    ) -> Result<()> {
        let current: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM agenda_section WHERE meeting_id = ?1 AND id = ?2",
        )
        .bind(meeting_id)
        .bind(section_id)
        .fetch_optional(self.db.as_ref())
        .await?;

        let Some((current,)) = current else {
            return Err(AppError::NotFound(format!(
                "agenda section {section_id} not found"
            )));
        };

        if SectionStatus::parse(&current)?.regresses_to(status) {
            return Err(AppError::Db(format!(
                "agenda section {section_id} cannot move from {current} to {}",
                status.as_str()
            )));
        }

        sqlx::query("UPDATE agenda_section SET status = ?1 WHERE meeting_id = ?2 AND id = ?3")
            .bind(status.as_str())
            .bind(meeting_id)
            .bind(section_id)
            .execute(self.db.as_ref())
            .await?;

        Ok(())
    }

    /// Record the outcome summary.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the meeting does not exist.
    pub async fn set_summary(&self, meeting_id: &str, summary: &str) -> Result<()> {
        let result = sqlx::query("UPDATE meeting SET summary = ?1 WHERE id = ?2")
            .bind(summary)
            .bind(meeting_id)
            .execute(self.db.as_ref())
            .await?;
        ensure_found(result.rows_affected(), meeting_id)
    }

    /// Record the metrics blob.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the meeting does not exist.
    pub async fn set_metrics(&self, meeting_id: &str, metrics: &serde_json::Value) -> Result<()> {
        let metrics = serde_json::to_string(metrics)
            .map_err(|e| AppError::Db(format!("serialize metrics: {e}")))?;
        let result = sqlx::query("UPDATE meeting SET metrics = ?1 WHERE id = ?2")
            .bind(metrics)
            .bind(meeting_id)
            .execute(self.db.as_ref())
            .await?;
        ensure_found(result.rows_affected(), meeting_id)
    }

    /// Set `ended_at` and mark the meeting completed. Succeeds only once.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the meeting has already ended, or
    /// `AppError::NotFound` if it does not exist.
    pub async fn mark_ended(&self, meeting_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE meeting SET ended_at = ?1, status = 'completed' \
             WHERE id = ?2 AND ended_at IS NULL",
        )
        .bind(format_ts(ended_at))
        .bind(meeting_id)
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(meeting_id).await? {
                Some(_) => Err(AppError::Db(format!("meeting {meeting_id} already ended"))),
                None => Err(AppError::NotFound(format!("meeting {meeting_id} not found"))),
            };
        }
        Ok(())
    }

    /// Mark a meeting as failed without ending it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the meeting does not exist.
    pub async fn mark_failed(&self, meeting_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE meeting SET status = 'failed' WHERE id = ?1 AND ended_at IS NULL",
        )
        .bind(meeting_id)
        .execute(self.db.as_ref())
        .await?;
        ensure_found(result.rows_affected(), meeting_id)
    }
}

fn ensure_found(rows_affected: u64, meeting_id: &str) -> Result<()> {
    if rows_affected == 0 {
        Err(AppError::NotFound(format!("meeting {meeting_id} not found")))
    } else {
        Ok(())
    }
}
