//! Unit tests for agenda validation and normalization.

use meeting_relay::agenda::{
    self, AgendaItemInput, MAX_AGENDA_VERSION, MAX_SECTIONS, MAX_TITLE_CHARS,
};
use meeting_relay::models::agenda::SectionStatus;
use meeting_relay::AppError;

fn item(id: Option<&str>, title: &str, persona: &str) -> AgendaItemInput {
    AgendaItemInput {
        id: id.map(str::to_owned),
        title: title.to_owned(),
        persona_id: persona.to_owned(),
        depends_on: None,
    }
}

// ── Defaults ─────────────────────────────────────────────────

#[test]
fn absent_agenda_uses_default() {
    let normalized = agenda::normalize(None).expect("default agenda");
    let ids: Vec<_> = normalized.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "agenda-opening",
            "agenda-analysis",
            "agenda-risks",
            "agenda-actions"
        ]
    );
}

#[test]
fn empty_agenda_uses_default() {
    let normalized = agenda::normalize(Some(Vec::new())).expect("default agenda");
    assert_eq!(normalized.sections, agenda::default_agenda());
}

#[test]
fn display_copy_is_all_pending() {
    let normalized = agenda::normalize(None).expect("default agenda");
    assert_eq!(normalized.display.len(), normalized.sections.len());
    assert!(normalized
        .display
        .iter()
        .all(|s| s.status == SectionStatus::Pending));
    for (entry, section) in normalized.sections.iter().zip(&normalized.display) {
        assert_eq!(entry.id, section.id);
        assert_eq!(entry.title, section.title);
    }
}

// ── Caller-supplied agendas ─────────────────────────────────

#[test]
fn preserves_order_and_supplied_ids() {
    let normalized = agenda::normalize(Some(vec![
        item(Some("intro"), "Introductions", "host"),
        item(Some("budget"), "Budget", "cfo"),
    ]))
    .expect("valid agenda");

    assert_eq!(normalized.sections[0].id, "intro");
    assert_eq!(normalized.sections[1].id, "budget");
    assert_eq!(normalized.sections[1].persona_id, "cfo");
}

#[test]
fn missing_ids_are_generated() {
    let normalized = agenda::normalize(Some(vec![
        item(None, "Introductions", "host"),
        item(Some("   "), "Budget", "cfo"),
    ]))
    .expect("valid agenda");

    assert!(normalized.sections[0].id.starts_with("section-"));
    assert!(normalized.sections[1].id.starts_with("section-"));
    assert_ne!(normalized.sections[0].id, normalized.sections[1].id);
}

#[test]
fn depends_on_is_carried_through() {
    let mut second = item(Some("b"), "Second", "host");
    second.depends_on = Some("a".into());
    let normalized =
        agenda::normalize(Some(vec![item(Some("a"), "First", "host"), second])).expect("valid");
    assert_eq!(normalized.display[1].depends_on.as_deref(), Some("a"));
}

#[test]
fn duplicate_ids_rejected() {
    let err = agenda::normalize(Some(vec![
        item(Some("dup"), "One", "host"),
        item(Some("dup"), "Two", "host"),
    ]))
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("duplicate")));
}

#[test]
fn blank_title_rejected() {
    let err = agenda::normalize(Some(vec![item(None, "   ", "host")])).unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m.contains("agenda[0]")));
}

#[test]
fn overlong_title_rejected() {
    let title = "x".repeat(MAX_TITLE_CHARS + 1);
    let err = agenda::normalize(Some(vec![item(None, &title, "host")])).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn title_at_limit_accepted() {
    let title = "é".repeat(MAX_TITLE_CHARS);
    assert!(agenda::normalize(Some(vec![item(None, &title, "host")])).is_ok());
}

#[test]
fn malformed_persona_rejected() {
    for persona in ["", "Host", "9lives", "has space"] {
        let err = agenda::normalize(Some(vec![item(None, "Title", persona)])).unwrap_err();
        assert!(
            matches!(err, AppError::Validation(_)),
            "persona {persona:?} should be rejected"
        );
    }
}

#[test]
fn too_many_sections_rejected() {
    let items = (0..=MAX_SECTIONS)
        .map(|_| item(None, "Title", "host"))
        .collect();
    assert!(matches!(
        agenda::normalize(Some(items)),
        Err(AppError::Validation(_))
    ));
}

// ── Agenda version ──────────────────────────────────────────

#[test]
fn version_bounds() {
    assert!(agenda::validate_version(None).is_ok());
    assert!(agenda::validate_version(Some(1)).is_ok());
    assert!(agenda::validate_version(Some(MAX_AGENDA_VERSION)).is_ok());
    assert!(agenda::validate_version(Some(0)).is_err());
    assert!(agenda::validate_version(Some(MAX_AGENDA_VERSION + 1)).is_err());
}
