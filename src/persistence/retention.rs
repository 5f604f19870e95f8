//! Retention service for time-based data purge.
//!
//! Runs as a background task deleting children first
//! (persona turns, action items, agenda sections),
//! then meetings that ended more than `retention_days` ago.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::db::Database;
use super::format_ts;
use crate::Result;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawn the retention purge background task.
///
/// The task runs hourly. On each tick it deletes all records of meetings
/// that ended longer than `retention_days` ago.
#[must_use]
pub fn spawn_retention_task(
    db: Arc<Database>,
    retention_days: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("retention task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = purge(&db, retention_days).await {
                        error!(?err, "retention purge failed");
                    }
                }
            }
        }
    })
}

/// Delete every meeting (and its children) that ended before the cutoff.
///
/// Returns the number of meetings removed.
///
/// # Errors
///
/// Returns `AppError::Db` if any delete statement fails.
pub async fn purge(db: &Database, retention_days: u32) -> Result<u64> {
    let cutoff = format_ts(Utc::now() - chrono::Duration::days(i64::from(retention_days)));

    let mut tx = db.begin().await?;

    // Delete children first to maintain referential integrity.
    let child_tables = ["persona_turn", "action_item", "agenda_section"];
    for table in child_tables {
        // `table` comes from the literal list above, never from input.
        let query = format!(
            "DELETE FROM {table} WHERE meeting_id IN \
             (SELECT id FROM meeting WHERE ended_at IS NOT NULL AND ended_at < ?1)"
        );
        sqlx::query(&query).bind(&cutoff).execute(&mut *tx).await?;
    }

    let removed = sqlx::query("DELETE FROM meeting WHERE ended_at IS NOT NULL AND ended_at < ?1")
        .bind(&cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    info!(retention_days, removed, "retention purge completed");
    Ok(removed)
}
