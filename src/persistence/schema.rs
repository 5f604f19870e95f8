//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS` — safe to
//! re-run on every server startup. Produces a convergent result.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// Creates the meeting table and its three child tables idempotently.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS meeting (
    id              TEXT PRIMARY KEY NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('running','completed','failed')),
    requested_by    TEXT,
    agenda_version  INTEGER,
    summary         TEXT,
    metrics         TEXT,
    created_at      TEXT NOT NULL,
    ended_at        TEXT
);

CREATE TABLE IF NOT EXISTS agenda_section (
    meeting_id      TEXT NOT NULL REFERENCES meeting(id),
    id              TEXT NOT NULL,
    position        INTEGER NOT NULL,
    title           TEXT NOT NULL,
    persona_id      TEXT NOT NULL,
    depends_on      TEXT,
    status          TEXT NOT NULL CHECK(status IN ('pending','in_progress','completed')),
    PRIMARY KEY (meeting_id, id)
);

CREATE TABLE IF NOT EXISTS persona_turn (
    meeting_id      TEXT NOT NULL REFERENCES meeting(id),
    sequence        INTEGER NOT NULL CHECK(sequence > 0),
    persona_id      TEXT NOT NULL,
    section_id      TEXT,
    summary         TEXT NOT NULL,
    risks           TEXT NOT NULL,
    opportunities   TEXT NOT NULL,
    recommendations TEXT NOT NULL,
    raw_content     TEXT NOT NULL,
    metrics         TEXT,
    created_at      TEXT NOT NULL,
    PRIMARY KEY (meeting_id, sequence)
);

CREATE TABLE IF NOT EXISTS action_item (
    id              TEXT PRIMARY KEY NOT NULL,
    meeting_id      TEXT NOT NULL REFERENCES meeting(id),
    title           TEXT NOT NULL,
    status          TEXT NOT NULL CHECK(status IN ('open','in_progress','done')),
    assignee        TEXT,
    due_date        TEXT,
    priority        TEXT NOT NULL CHECK(priority IN ('low','medium','high')),
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_action_item_meeting ON action_item(meeting_id);
CREATE INDEX IF NOT EXISTS idx_meeting_ended ON meeting(ended_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
