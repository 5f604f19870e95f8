//! Persona content composition.
//!
//! The worker delegates the actual wording of each turn to a
//! [`TurnComposer`]. [`TemplateComposer`] is a deterministic composer used
//! when no generation backend is wired in.

use serde_json::json;

use crate::models::agenda::AgendaEntry;
use crate::models::turn::TurnContent;
use crate::store::BoxFuture;

/// Produces the content of one persona turn.
pub trait TurnComposer: Send + Sync {
    /// Compose the turn for `section` of `meeting_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Worker`](crate::AppError::Worker) if the content
    /// cannot be produced.
    fn compose<'a>(
        &'a self,
        meeting_id: &'a str,
        section: &'a AgendaEntry,
    ) -> BoxFuture<'a, TurnContent>;

    /// Condense the meeting into its outcome summary.
    fn summarize(&self, agenda: &[AgendaEntry], turns: &[TurnContent]) -> String;
}

/// Composer that fills fixed templates from the section title and persona.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateComposer;

impl TurnComposer for TemplateComposer {
    fn compose<'a>(
        &'a self,
        _meeting_id: &'a str,
        section: &'a AgendaEntry,
    ) -> BoxFuture<'a, TurnContent> {
        Box::pin(async move {
            let persona = &section.persona_id;
            let title = &section.title;
            let mut raw_content = format!("[{persona}] {title}");
            if let Some(dep) = &section.depends_on {
                raw_content.push_str(&format!(" (following {dep})"));
            }

            Ok(TurnContent {
                summary: format!("{persona} reviewed \"{title}\"."),
                risks: vec![format!("Open questions remain on {title}.")],
                opportunities: vec![format!("{title} can be reused in the next cycle.")],
                recommendations: vec![format!("Follow up on {title}")],
                raw_content,
                metrics: Some(json!({ "words": title.split_whitespace().count() })),
            })
        })
    }

    fn summarize(&self, agenda: &[AgendaEntry], turns: &[TurnContent]) -> String {
        let titles: Vec<&str> = agenda.iter().map(|s| s.title.as_str()).collect();
        format!(
            "Covered {} section(s) with {} contribution(s): {}.",
            agenda.len(),
            turns.len(),
            titles.join(", ")
        )
    }
}
