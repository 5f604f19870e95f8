//! [`MeetingStore`] backed by the `SQLite` repositories.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::action_item::ActionItem;
use crate::models::meeting::Meeting;
use crate::models::turn::PersonaTurn;
use crate::store::{ActivityCounts, BoxFuture, MeetingStore};
use crate::AppError;

use super::action_item_repo::ActionItemRepo;
use super::db::Database;
use super::meeting_repo::MeetingRepo;
use super::turn_repo::TurnRepo;

/// Store implementation composed of the three repositories.
#[derive(Clone)]
pub struct SqliteMeetingStore {
    meetings: MeetingRepo,
    turns: TurnRepo,
    action_items: ActionItemRepo,
}

impl SqliteMeetingStore {
    /// Build the store over a shared pool.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            meetings: MeetingRepo::new(Arc::clone(&db)),
            turns: TurnRepo::new(Arc::clone(&db)),
            action_items: ActionItemRepo::new(db),
        }
    }
}

impl MeetingStore for SqliteMeetingStore {
    fn create_meeting<'a>(&'a self, meeting: &'a Meeting) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.meetings.create(meeting).await?;
            Ok(())
        })
    }

    fn get_meeting<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, Meeting> {
        Box::pin(async move {
            self.meetings
                .get_by_id(meeting_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("meeting {meeting_id} not found")))
        })
    }

    fn list_turns_after<'a>(
        &'a self,
        meeting_id: &'a str,
        after: i64,
    ) -> BoxFuture<'a, Vec<PersonaTurn>> {
        Box::pin(self.turns.list_after(meeting_id, after))
    }

    fn list_action_items_excluding<'a>(
        &'a self,
        meeting_id: &'a str,
        exclude: &'a HashSet<String>,
    ) -> BoxFuture<'a, Vec<ActionItem>> {
        Box::pin(self.action_items.list_excluding(meeting_id, exclude))
    }

    fn count_activity<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, ActivityCounts> {
        Box::pin(async move {
            let (turns, action_items) = tokio::try_join!(
                self.turns.count_for_meeting(meeting_id),
                self.action_items.count_for_meeting(meeting_id),
            )?;
            Ok(ActivityCounts {
                turns,
                action_items,
            })
        })
    }
}
