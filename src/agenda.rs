//! Agenda validation and normalization.
//!
//! Turns the caller-supplied agenda into the ordered list of sections the
//! worker runs through. This is the only place a meeting request can be
//! rejected synchronously; nothing is persisted until it succeeds.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::agenda::{AgendaEntry, AgendaSection, SectionStatus};
use crate::{AppError, Result};

/// Maximum number of sections accepted in one agenda.
pub const MAX_SECTIONS: usize = 50;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Highest accepted agenda format version.
pub const MAX_AGENDA_VERSION: u8 = 99;

#[allow(clippy::expect_used)] // Literal pattern, checked by tests.
static PERSONA_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").expect("persona id pattern compiles"));

/// One agenda entry as received from the caller.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AgendaItemInput {
    /// Caller-chosen identifier; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Section title.
    #[serde(default)]
    pub title: String,
    /// Assigned persona.
    #[serde(default)]
    pub persona_id: String,
    /// Section that should precede this one.
    #[serde(default)]
    pub depends_on: Option<String>,
}

/// Result of normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAgenda {
    /// Ordered entries handed to the worker.
    pub sections: Vec<AgendaEntry>,
    /// Display copy with every section marked `pending`.
    pub display: Vec<AgendaSection>,
}

/// The agenda used when the caller supplies none.
#[must_use]
pub fn default_agenda() -> Vec<AgendaEntry> {
    [
        ("agenda-opening", "Opening and objectives", "facilitator", None),
        (
            "agenda-analysis",
            "Market and opportunity review",
            "strategist",
            Some("agenda-opening"),
        ),
        (
            "agenda-risks",
            "Risk assessment",
            "risk_analyst",
            Some("agenda-analysis"),
        ),
        (
            "agenda-actions",
            "Action planning",
            "operator",
            Some("agenda-risks"),
        ),
    ]
    .into_iter()
    .map(|(id, title, persona_id, depends_on)| AgendaEntry {
        id: id.to_owned(),
        title: title.to_owned(),
        persona_id: persona_id.to_owned(),
        depends_on: depends_on.map(str::to_owned),
    })
    .collect()
}

/// Validate a caller-supplied agenda version.
///
/// # Errors
///
/// Returns `AppError::Validation` when the version is zero or above
/// [`MAX_AGENDA_VERSION`].
pub fn validate_version(version: Option<u8>) -> Result<()> {
    match version {
        Some(v) if v == 0 || v > MAX_AGENDA_VERSION => Err(AppError::Validation(format!(
            "agendaVersion must be between 1 and {MAX_AGENDA_VERSION}"
        ))),
        _ => Ok(()),
    }
}

/// Validate and canonicalize an agenda.
///
/// An absent or empty agenda is replaced by [`default_agenda`]. Entries
/// without an id receive a generated `section-<uuid>` id.
///
/// # Errors
///
/// Returns `AppError::Validation` if a title is blank or too long, a persona
/// id is malformed, supplied ids collide, or the agenda is too long.
pub fn normalize(input: Option<Vec<AgendaItemInput>>) -> Result<NormalizedAgenda> {
    let items = input.unwrap_or_default();
    let sections = if items.is_empty() {
        default_agenda()
    } else {
        normalize_items(items)?
    };

    let display = sections
        .iter()
        .map(|entry| entry.with_status(SectionStatus::Pending))
        .collect();

    Ok(NormalizedAgenda { sections, display })
}

fn normalize_items(items: Vec<AgendaItemInput>) -> Result<Vec<AgendaEntry>> {
    if items.len() > MAX_SECTIONS {
        return Err(AppError::Validation(format!(
            "agenda may contain at most {MAX_SECTIONS} sections"
        )));
    }

    let mut seen_ids = HashSet::new();
    let mut sections = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        validate_item(index, &item)?;

        let id = match item.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                if !seen_ids.insert(id.clone()) {
                    return Err(AppError::Validation(format!(
                        "agenda[{index}]: duplicate section id {id}"
                    )));
                }
                id
            }
            None => generate_section_id(),
        };

        sections.push(AgendaEntry {
            id,
            title: item.title,
            persona_id: item.persona_id,
            depends_on: item.depends_on,
        });
    }

    Ok(sections)
}

fn validate_item(index: usize, item: &AgendaItemInput) -> Result<()> {
    if item.title.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "agenda[{index}]: title must not be empty"
        )));
    }
    if item.title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "agenda[{index}]: title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    if !is_valid_persona_id(&item.persona_id) {
        return Err(AppError::Validation(format!(
            "agenda[{index}]: invalid persona id {:?}",
            item.persona_id
        )));
    }
    Ok(())
}

/// Whether `persona_id` is a well-formed persona identifier.
#[must_use]
pub fn is_valid_persona_id(persona_id: &str) -> bool {
    PERSONA_ID.is_match(persona_id)
}

fn generate_section_id() -> String {
    format!("section-{}", Uuid::new_v4().simple())
}
