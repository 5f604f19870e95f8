//! Read/create interface of the meeting record store.
//!
//! The stream session only ever creates a meeting and reads from the store;
//! every other write belongs to the worker. Keeping the surface behind a
//! trait lets the synchronizer run against fakes in tests.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::models::action_item::ActionItem;
use crate::models::meeting::Meeting;
use crate::models::turn::PersonaTurn;
use crate::Result;

/// Boxed future returned by store and worker trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Turn and action item totals for one meeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    /// Persona turns written so far.
    pub turns: i64,
    /// Action items written so far.
    pub action_items: i64,
}

/// Store operations consumed by the streaming core.
pub trait MeetingStore: Send + Sync {
    /// Persist a new meeting with its agenda.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the insert fails.
    fn create_meeting<'a>(&'a self, meeting: &'a Meeting) -> BoxFuture<'a, ()>;

    /// Read the meeting, its agenda, metadata, summary and metrics.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`](crate::AppError::NotFound) if the
    /// meeting does not exist.
    fn get_meeting<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, Meeting>;

    /// List persona turns with a sequence strictly greater than `after`.
    ///
    /// Implementations are not required to return them sorted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the read fails.
    fn list_turns_after<'a>(
        &'a self,
        meeting_id: &'a str,
        after: i64,
    ) -> BoxFuture<'a, Vec<PersonaTurn>>;

    /// List action items whose id is not contained in `exclude`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the read fails.
    fn list_action_items_excluding<'a>(
        &'a self,
        meeting_id: &'a str,
        exclude: &'a HashSet<String>,
    ) -> BoxFuture<'a, Vec<ActionItem>>;

    /// Count turns and action items written for a meeting.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Db`](crate::AppError::Db) if the read fails.
    fn count_activity<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, ActivityCounts>;
}
