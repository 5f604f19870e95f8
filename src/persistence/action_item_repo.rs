//! Action item repository for `SQLite` persistence.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite};

use crate::models::action_item::{ActionItem, ActionItemStatus, Priority};
use crate::{AppError, Result};

use super::db::Database;
use super::{format_ts, parse_ts};

/// Repository wrapper around `SQLite` for action item records.
#[derive(Clone)]
pub struct ActionItemRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ActionItemRow {
    id: String,
    meeting_id: String,
    title: String,
    status: String,
    assignee: Option<String>,
    due_date: Option<String>,
    priority: String,
    created_at: String,
}

impl ActionItemRow {
    /// Convert a database row into the domain model.
    fn into_action_item(self) -> Result<ActionItem> {
        let due_date = self
            .due_date
            .as_deref()
            .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid due_date: {e}")))?;

        Ok(ActionItem {
            status: ActionItemStatus::parse(&self.status)?,
            priority: Priority::parse(&self.priority)?,
            created_at: parse_ts("created_at", &self.created_at)?,
            id: self.id,
            meeting_id: self.meeting_id,
            title: self.title,
            assignee: self.assignee,
            due_date,
        })
    }
}

impl ActionItemRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new action item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn create(&self, item: &ActionItem) -> Result<ActionItem> {
        sqlx::query(
            "INSERT INTO action_item (id, meeting_id, title, status, assignee, due_date,
             priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&item.id)
        .bind(&item.meeting_id)
        .bind(&item.title)
        .bind(item.status.as_str())
        .bind(&item.assignee)
        .bind(item.due_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(item.priority.as_str())
        .bind(format_ts(item.created_at))
        .execute(self.db.as_ref())
        .await?;

        Ok(item.clone())
    }

    /// List all action items of a meeting, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn list_for_meeting(&self, meeting_id: &str) -> Result<Vec<ActionItem>> {
        let rows: Vec<ActionItemRow> = sqlx::query_as(
            "SELECT * FROM action_item WHERE meeting_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(meeting_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(ActionItemRow::into_action_item)
            .collect()
    }

    /// List action items of a meeting whose id is not in `exclude`, oldest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn list_excluding(
        &self,
        meeting_id: &str,
        exclude: &HashSet<String>,
    ) -> Result<Vec<ActionItem>> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT * FROM action_item WHERE meeting_id = ");
        query.push_bind(meeting_id);
        if !exclude.is_empty() {
            query.push(" AND id NOT IN (");
            let mut ids = query.separated(", ");
            for id in exclude {
                ids.push_bind(id.as_str());
            }
            ids.push_unseparated(")");
        }
        query.push(" ORDER BY created_at ASC, id ASC");

        let rows: Vec<ActionItemRow> = query
            .build_query_as()
            .fetch_all(self.db.as_ref())
            .await?;

        rows.into_iter()
            .map(ActionItemRow::into_action_item)
            .collect()
    }

    /// Count action items recorded for a meeting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_for_meeting(&self, meeting_id: &str) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM action_item WHERE meeting_id = ?1")
                .bind(meeting_id)
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }
}
