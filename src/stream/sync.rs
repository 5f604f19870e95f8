//! Incremental synchronizer run on every poll tick.
//!
//! [`SyncState`] holds what a session has already delivered: the persona
//! turn cursor, the emitted action item ids, the last emitted status of each
//! agenda section and the one-shot flags. [`SyncState::apply`] diffs a fresh
//! [`Snapshot`] against it and returns only the new events, with any
//! termination evaluated after all deltas.
//!
//! [`Synchronizer`] reads the snapshot from the store and worker. Its state
//! sits behind a mutex acquired with `try_lock`, so a tick that arrives while
//! another is in flight is dropped instead of racing on the cursors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::event::StreamEvent;
use crate::models::action_item::ActionItem;
use crate::models::agenda::{AgendaSection, SectionStatus};
use crate::models::meeting::Meeting;
use crate::models::turn::PersonaTurn;
use crate::store::MeetingStore;
use crate::worker::{JobHandle, JobStatus, MeetingWorker};
use crate::Result;

/// Store and worker state read during one tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Meeting with agenda, metadata, summary and metrics.
    pub meeting: Meeting,
    /// Turns above the cursor, in any order.
    pub turns: Vec<PersonaTurn>,
    /// Action items not yet emitted, in any order.
    pub action_items: Vec<ActionItem>,
    /// Worker job status.
    pub job_status: JobStatus,
}

/// Why the session must end after this tick's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The meeting's `ended_at` is set.
    Completed,
    /// The worker reported failure.
    WorkerFailed {
        /// Worker-reported reason.
        reason: String,
    },
}

/// Events produced by one tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    /// New events in delivery order.
    pub events: Vec<StreamEvent>,
    /// Set when the last event is `completed` or `error`.
    pub termination: Option<Termination>,
}

/// Result of [`Synchronizer::try_tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// A previous tick was still running; nothing was read.
    Skipped,
    /// The tick ran.
    Ran(TickOutput),
}

/// Per-session delivery state.
#[derive(Debug, Default)]
pub struct SyncState {
    cursor: i64,
    emitted_action_items: HashSet<String>,
    section_status: HashMap<String, SectionStatus>,
    summary_sent: bool,
    metrics_sent: bool,
    completion_notified: bool,
}

impl SyncState {
    /// Fresh state with the initial agenda snapshot already delivered.
    #[must_use]
    pub fn seeded(agenda: &[AgendaSection]) -> Self {
        Self {
            section_status: agenda
                .iter()
                .map(|section| (section.id.clone(), section.status))
                .collect(),
            ..Self::default()
        }
    }

    /// Highest persona turn sequence already delivered.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Ids of every action item already delivered.
    #[must_use]
    pub fn emitted_action_items(&self) -> &HashSet<String> {
        &self.emitted_action_items
    }

    /// Last delivered status of a section.
    #[must_use]
    pub fn last_status(&self, section_id: &str) -> Option<SectionStatus> {
        self.section_status.get(section_id).copied()
    }

    /// Whether `completed` or a worker `error` has been produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completion_notified
    }

    /// Diff `snapshot` against what was already delivered.
    pub fn apply(&mut self, snapshot: Snapshot) -> TickOutput {
        let Snapshot {
            meeting,
            mut turns,
            mut action_items,
            job_status,
        } = snapshot;
        let meeting_id = meeting.id.as_str();
        let mut events = Vec::new();

        // ── Agenda: level-triggered, forward only ───────────
        for section in &meeting.agenda {
            match self.section_status.get(&section.id).copied() {
                Some(last) if last == section.status => {}
                Some(last) if last.regresses_to(section.status) => {
                    warn!(
                        meeting_id,
                        section_id = %section.id,
                        from = last.as_str(),
                        to = section.status.as_str(),
                        "ignoring agenda status regression"
                    );
                }
                _ => {
                    events.push(StreamEvent::agenda(meeting_id, section));
                    self.section_status
                        .insert(section.id.clone(), section.status);
                }
            }
        }

        // ── Persona turns: strictly ascending past the cursor ──
        turns.retain(|turn| turn.sequence > self.cursor);
        turns.sort_by_key(|turn| turn.sequence);
        turns.dedup_by_key(|turn| turn.sequence);
        for turn in &turns {
            events.push(StreamEvent::persona_response(turn));
            self.cursor = turn.sequence;
        }

        // ── Action items: first sighting only ───────────────
        action_items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        for item in &action_items {
            if self.emitted_action_items.insert(item.id.clone()) {
                events.push(StreamEvent::action_item(item));
            }
        }

        // ── One-shot fields ─────────────────────────────────
        if !self.summary_sent {
            if let Some(summary) = &meeting.summary {
                events.push(StreamEvent::summary(meeting_id, summary));
                self.summary_sent = true;
            }
        }
        if !self.metrics_sent {
            if let Some(metrics) = &meeting.metrics {
                events.push(StreamEvent::metrics(meeting_id, metrics));
                self.metrics_sent = true;
            }
        }

        // ── Termination, after every delta ──────────────────
        let termination = if self.completion_notified {
            None
        } else if let Some(ended_at) = meeting.ended_at {
            events.push(StreamEvent::completed(meeting_id, ended_at));
            Some(Termination::Completed)
        } else if let JobStatus::Failed { reason } = job_status {
            events.push(StreamEvent::error(meeting_id, &reason));
            Some(Termination::WorkerFailed { reason })
        } else {
            None
        };
        if termination.is_some() {
            self.completion_notified = true;
        }

        TickOutput {
            events,
            termination,
        }
    }
}

/// Reads store and worker state for one session and diffs it.
pub struct Synchronizer {
    meeting_id: String,
    job: JobHandle,
    store: Arc<dyn MeetingStore>,
    worker: Arc<dyn MeetingWorker>,
    state: Mutex<SyncState>,
}

impl Synchronizer {
    /// Create a synchronizer whose state already reflects `initial_agenda`.
    #[must_use]
    pub fn new(
        job: JobHandle,
        store: Arc<dyn MeetingStore>,
        worker: Arc<dyn MeetingWorker>,
        initial_agenda: &[AgendaSection],
    ) -> Self {
        Self {
            meeting_id: job.meeting_id.clone(),
            job,
            store,
            worker,
            state: Mutex::new(SyncState::seeded(initial_agenda)),
        }
    }

    /// Meeting being synchronized.
    #[must_use]
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    /// Current cursor, or `None` while a tick holds the state.
    #[must_use]
    pub fn cursor(&self) -> Option<i64> {
        self.state.try_lock().ok().map(|state| state.cursor())
    }

    /// Run one tick unless another is already in flight.
    ///
    /// All reads happen before any state changes, so a failed read leaves
    /// the session's cursors untouched.
    ///
    /// # Errors
    ///
    /// Returns the first store or worker error encountered while reading.
    pub async fn try_tick(&self) -> Result<TickOutcome> {
        let Ok(mut state) = self.state.try_lock() else {
            debug!(meeting_id = %self.meeting_id, "poll tick dropped, previous tick in flight");
            return Ok(TickOutcome::Skipped);
        };

        if state.is_finished() {
            return Ok(TickOutcome::Ran(TickOutput::default()));
        }

        let snapshot = self.read(&state).await?;
        Ok(TickOutcome::Ran(state.apply(snapshot)))
    }

    /// Termination signals are read before the deltas, so every turn and
    /// action item written before `ended_at` or a worker failure is part of
    /// the same snapshot.
    async fn read(&self, state: &SyncState) -> Result<Snapshot> {
        let meeting_id = self.meeting_id.as_str();
        let (meeting, job_status) = tokio::try_join!(
            self.store.get_meeting(meeting_id),
            self.worker.job_status(&self.job),
        )?;
        let (turns, action_items) = tokio::try_join!(
            self.store.list_turns_after(meeting_id, state.cursor()),
            self.store
                .list_action_items_excluding(meeting_id, state.emitted_action_items()),
        )?;

        Ok(Snapshot {
            meeting,
            turns,
            action_items,
            job_status,
        })
    }
}
