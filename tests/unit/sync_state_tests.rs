//! Unit tests for the incremental diff in `SyncState::apply`.
//!
//! Covers cursor monotonicity, duplicate suppression, level-triggered
//! agenda events, one-shot fields and termination ordering.

use chrono::{Duration, Utc};
use serde_json::json;

use meeting_relay::models::action_item::{ActionItem, Priority};
use meeting_relay::models::agenda::{AgendaSection, SectionStatus};
use meeting_relay::models::meeting::Meeting;
use meeting_relay::models::turn::{PersonaTurn, TurnContent};
use meeting_relay::stream::{EventType, Snapshot, StreamEvent, SyncState, Termination};
use meeting_relay::worker::JobStatus;

fn section(id: &str, status: SectionStatus) -> AgendaSection {
    AgendaSection {
        id: id.into(),
        title: format!("Section {id}"),
        persona_id: "host".into(),
        depends_on: None,
        status,
    }
}

fn meeting(agenda: Vec<AgendaSection>) -> Meeting {
    let mut meeting = Meeting::new(None, None, agenda);
    meeting.id = "m-1".into();
    meeting
}

fn turn(sequence: i64) -> PersonaTurn {
    PersonaTurn {
        meeting_id: "m-1".into(),
        sequence,
        persona_id: "host".into(),
        section_id: Some("a".into()),
        created_at: Utc::now(),
        content: TurnContent {
            summary: format!("turn {sequence}"),
            ..TurnContent::default()
        },
    }
}

fn snapshot(meeting: Meeting, turns: Vec<PersonaTurn>, items: Vec<ActionItem>) -> Snapshot {
    Snapshot {
        meeting,
        turns,
        action_items: items,
        job_status: JobStatus::Running,
    }
}

fn kinds(events: &[StreamEvent]) -> Vec<EventType> {
    events.iter().map(|e| e.kind).collect()
}

fn sequences(events: &[StreamEvent]) -> Vec<i64> {
    events
        .iter()
        .filter(|e| e.kind == EventType::PersonaResponse)
        .map(|e| e.data["sequence"].as_i64().unwrap())
        .collect()
}

fn pending_agenda() -> Vec<AgendaSection> {
    vec![
        section("a", SectionStatus::Pending),
        section("b", SectionStatus::Pending),
    ]
}

// ── Persona turns ───────────────────────────────────────────

#[test]
fn turns_emitted_in_sequence_order() {
    let mut state = SyncState::seeded(&pending_agenda());
    let out = state.apply(snapshot(
        meeting(pending_agenda()),
        vec![turn(3), turn(1), turn(2)],
        Vec::new(),
    ));
    assert_eq!(sequences(&out.events), [1, 2, 3]);
    assert_eq!(state.cursor(), 3);
}

#[test]
fn cursor_never_decreases_and_turns_never_repeat() {
    let mut state = SyncState::seeded(&pending_agenda());
    state.apply(snapshot(meeting(pending_agenda()), vec![turn(1), turn(2)], Vec::new()));

    // Store returns a stale row alongside a new one.
    let out = state.apply(snapshot(
        meeting(pending_agenda()),
        vec![turn(2), turn(4), turn(1)],
        Vec::new(),
    ));
    assert_eq!(sequences(&out.events), [4]);
    assert_eq!(state.cursor(), 4);

    let out = state.apply(snapshot(meeting(pending_agenda()), vec![turn(3)], Vec::new()));
    assert!(out.events.is_empty());
    assert_eq!(state.cursor(), 4);
}

#[test]
fn duplicate_sequences_in_one_read_emit_once() {
    let mut state = SyncState::default();
    let out = state.apply(snapshot(meeting(Vec::new()), vec![turn(1), turn(1)], Vec::new()));
    assert_eq!(sequences(&out.events), [1]);
}

// ── Action items ────────────────────────────────────────────

#[test]
fn action_items_emitted_once_in_creation_order() {
    let mut state = SyncState::default();
    let mut early = ActionItem::new("m-1".into(), "early".into(), Priority::Low);
    early.created_at = Utc::now() - Duration::seconds(10);
    let late = ActionItem::new("m-1".into(), "late".into(), Priority::High);

    let out = state.apply(snapshot(
        meeting(Vec::new()),
        Vec::new(),
        vec![late.clone(), early.clone()],
    ));
    let titles: Vec<_> = out
        .events
        .iter()
        .map(|e| e.data["title"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(titles, ["early", "late"]);
    assert!(state.emitted_action_items().contains(&early.id));

    let out = state.apply(snapshot(meeting(Vec::new()), Vec::new(), vec![early, late]));
    assert!(out.events.is_empty());
}

// ── Agenda ──────────────────────────────────────────────────

#[test]
fn seeded_agenda_is_not_reemitted() {
    let mut state = SyncState::seeded(&pending_agenda());
    let out = state.apply(snapshot(meeting(pending_agenda()), Vec::new(), Vec::new()));
    assert!(out.events.is_empty());
}

#[test]
fn agenda_emits_only_changed_sections() {
    let mut state = SyncState::seeded(&pending_agenda());
    let agenda = vec![
        section("a", SectionStatus::InProgress),
        section("b", SectionStatus::Pending),
    ];
    let out = state.apply(snapshot(meeting(agenda.clone()), Vec::new(), Vec::new()));
    assert_eq!(kinds(&out.events), [EventType::Agenda]);
    assert_eq!(out.events[0].data["sectionId"], "a");
    assert_eq!(out.events[0].data["status"], "in_progress");

    let out = state.apply(snapshot(meeting(agenda), Vec::new(), Vec::new()));
    assert!(out.events.is_empty());
}

#[test]
fn skipped_intermediate_status_emits_latest() {
    let mut state = SyncState::seeded(&pending_agenda());
    let agenda = vec![
        section("a", SectionStatus::Completed),
        section("b", SectionStatus::Pending),
    ];
    let out = state.apply(snapshot(meeting(agenda), Vec::new(), Vec::new()));
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].data["status"], "completed");
    assert_eq!(state.last_status("a"), Some(SectionStatus::Completed));
}

#[test]
fn agenda_regression_is_ignored() {
    let mut state = SyncState::seeded(&[section("a", SectionStatus::Completed)]);
    let out = state.apply(snapshot(
        meeting(vec![section("a", SectionStatus::InProgress)]),
        Vec::new(),
        Vec::new(),
    ));
    assert!(out.events.is_empty());
    assert_eq!(state.last_status("a"), Some(SectionStatus::Completed));
}

// ── Summary, metrics, termination ───────────────────────────

#[test]
fn happy_path_orders_deltas_before_completed() {
    let mut state = SyncState::seeded(&pending_agenda());
    let mut done = meeting(vec![
        section("a", SectionStatus::Completed),
        section("b", SectionStatus::Completed),
    ]);
    done.summary = Some("All good".into());
    done.metrics = Some(json!({ "turns": 2 }));
    done.ended_at = Some(Utc::now());
    let item = ActionItem::new("m-1".into(), "Follow up".into(), Priority::Medium);

    let out = state.apply(Snapshot {
        meeting: done,
        turns: vec![turn(1), turn(2)],
        action_items: vec![item],
        job_status: JobStatus::Completed,
    });

    assert_eq!(
        kinds(&out.events),
        [
            EventType::Agenda,
            EventType::Agenda,
            EventType::PersonaResponse,
            EventType::PersonaResponse,
            EventType::ActionItem,
            EventType::Summary,
            EventType::Metrics,
            EventType::Completed,
        ]
    );
    assert_eq!(out.termination, Some(Termination::Completed));
    assert!(state.is_finished());
}

#[test]
fn summary_and_metrics_emitted_once() {
    let mut state = SyncState::default();
    let mut m = meeting(Vec::new());
    m.summary = Some("draft".into());
    m.metrics = Some(json!({}));

    let out = state.apply(snapshot(m.clone(), Vec::new(), Vec::new()));
    assert_eq!(kinds(&out.events), [EventType::Summary, EventType::Metrics]);

    m.summary = Some("changed".into());
    let out = state.apply(snapshot(m, Vec::new(), Vec::new()));
    assert!(out.events.is_empty());
}

#[test]
fn worker_failure_emits_error_last() {
    let mut state = SyncState::default();
    let out = state.apply(Snapshot {
        meeting: meeting(Vec::new()),
        turns: vec![turn(1)],
        action_items: Vec::new(),
        job_status: JobStatus::Failed {
            reason: "composer crashed".into(),
        },
    });

    assert_eq!(
        kinds(&out.events),
        [EventType::PersonaResponse, EventType::Error]
    );
    assert_eq!(out.events[1].data["message"], "composer crashed");
    assert_eq!(
        out.termination,
        Some(Termination::WorkerFailed {
            reason: "composer crashed".into()
        })
    );
}

#[test]
fn ended_meeting_wins_over_failed_job() {
    let mut state = SyncState::default();
    let mut m = meeting(Vec::new());
    m.ended_at = Some(Utc::now());
    let out = state.apply(Snapshot {
        meeting: m,
        turns: Vec::new(),
        action_items: Vec::new(),
        job_status: JobStatus::Failed {
            reason: "late".into(),
        },
    });
    assert_eq!(out.termination, Some(Termination::Completed));
    assert_eq!(kinds(&out.events), [EventType::Completed]);
}

#[test]
fn completion_is_notified_once() {
    let mut state = SyncState::default();
    let mut m = meeting(Vec::new());
    m.ended_at = Some(Utc::now());

    let first = state.apply(snapshot(m.clone(), Vec::new(), Vec::new()));
    assert!(first.termination.is_some());

    let second = state.apply(snapshot(m, Vec::new(), Vec::new()));
    assert!(second.termination.is_none());
    assert!(second.events.is_empty());
}
