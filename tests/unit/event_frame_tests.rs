//! Unit tests for event payloads and `data:` framing.

use chrono::Utc;
use serde_json::Value;

use meeting_relay::models::action_item::{ActionItem, Priority};
use meeting_relay::models::agenda::{AgendaSection, SectionStatus};
use meeting_relay::models::turn::{PersonaTurn, TurnContent};
use meeting_relay::stream::{EventType, StreamEvent};

fn decode(event: &StreamEvent) -> Value {
    let frame = event.to_frame().expect("encode");
    let text = std::str::from_utf8(&frame).expect("utf8");
    let json = text
        .strip_prefix("data: ")
        .and_then(|rest| rest.strip_suffix("\n\n"))
        .expect("data frame");
    serde_json::from_str(json).expect("json payload")
}

#[test]
fn agenda_event_carries_section_fields() {
    let section = AgendaSection {
        id: "s1".into(),
        title: "Budget".into(),
        persona_id: "cfo".into(),
        depends_on: Some("s0".into()),
        status: SectionStatus::InProgress,
    };
    let value = decode(&StreamEvent::agenda("m-1", &section));

    assert_eq!(value["type"], "agenda");
    assert_eq!(value["data"]["meetingId"], "m-1");
    assert_eq!(value["data"]["sectionId"], "s1");
    assert_eq!(value["data"]["personaId"], "cfo");
    assert_eq!(value["data"]["dependsOn"], "s0");
    assert_eq!(value["data"]["status"], "in_progress");
    assert!(value["timestamp"].is_string());
}

#[test]
fn persona_response_includes_sequence_and_content() {
    let turn = PersonaTurn {
        meeting_id: "m-1".into(),
        sequence: 3,
        persona_id: "cfo".into(),
        section_id: Some("s1".into()),
        created_at: Utc::now(),
        content: TurnContent {
            summary: "Tight budget".into(),
            recommendations: vec!["Cut travel".into()],
            ..TurnContent::default()
        },
    };
    let value = decode(&StreamEvent::persona_response(&turn));

    assert_eq!(value["type"], "persona-response");
    assert_eq!(value["data"]["sequence"], 3);
    assert_eq!(value["data"]["personaId"], "cfo");
    assert_eq!(value["data"]["summary"], "Tight budget");
    assert_eq!(value["data"]["recommendations"][0], "Cut travel");
}

#[test]
fn action_item_event_uses_kebab_type() {
    let item = ActionItem::new("m-1".into(), "Cut travel".into(), Priority::Low);
    let value = decode(&StreamEvent::action_item(&item));
    assert_eq!(value["type"], "action-item");
    assert_eq!(value["data"]["id"], item.id.as_str());
    assert_eq!(value["data"]["priority"], "low");
}

#[test]
fn terminal_events() {
    assert!(StreamEvent::completed("m-1", Utc::now()).is_terminal());
    assert!(StreamEvent::error("m-1", "boom").is_terminal());
    assert!(!StreamEvent::summary("m-1", "ok").is_terminal());
}

#[test]
fn error_event_has_message() {
    let value = decode(&StreamEvent::error("m-1", "worker gave up"));
    assert_eq!(value["type"], "error");
    assert_eq!(value["data"]["message"], "worker gave up");
}

#[test]
fn multiline_payload_stays_single_record() {
    let frame = StreamEvent::summary("m-1", "line one\nline two")
        .to_frame()
        .expect("encode");
    let text = std::str::from_utf8(&frame).expect("utf8");
    assert_eq!(text.matches("\n\n").count(), 1);
    assert!(text.ends_with("\n\n"));
}

#[test]
fn event_round_trips_through_serde() {
    let event = StreamEvent::metrics("m-1", &serde_json::json!({ "turns": 4 }));
    let value = decode(&event);
    let parsed: StreamEvent = serde_json::from_value(value).expect("parse event");
    assert_eq!(parsed.kind, EventType::Metrics);
    assert_eq!(parsed.data["metrics"]["turns"], 4);
}
