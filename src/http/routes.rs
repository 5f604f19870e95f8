//! Request handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, Instrument};

use super::AppState;
use crate::agenda::{self, AgendaItemInput, NormalizedAgenda};
use crate::models::meeting::Meeting;
use crate::store::ActivityCounts;
use crate::stream::{SessionSettings, StreamEvent, StreamSession, Synchronizer};
use crate::worker::JobHandle;
use crate::{AppError, Result};

/// Message sent in-band when a validated meeting cannot be started.
pub const START_FAILURE_MESSAGE: &str = "meeting could not be started";

/// Body of `POST /meetings/stream`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMeetingRequest {
    /// Agenda sections; the default agenda is used when absent or empty.
    #[serde(default)]
    pub agenda: Option<Vec<AgendaItemInput>>,
    /// Agenda format version.
    #[serde(default)]
    pub agenda_version: Option<u8>,
    /// Caller identity recorded in the meeting metadata.
    #[serde(default)]
    pub requested_by: Option<String>,
}

/// Body of `GET /meetings/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingStatusView {
    /// Meeting metadata, agenda, summary and metrics.
    #[serde(flatten)]
    pub meeting: Meeting,
    /// Turn and action item totals.
    pub activity: ActivityCounts,
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
pub async fn health() -> &'static str {
    "ok"
}

/// Parse the start request; an empty body means "all defaults".
///
/// # Errors
///
/// Returns `AppError::Validation` if the body is not a valid request.
pub fn parse_start_request(body: &[u8]) -> Result<StartMeetingRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartMeetingRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::Validation(format!("malformed request body: {err}")))
}

/// Handler for `POST /meetings/stream`.
///
/// Validation happens before anything is created; a rejected request gets
/// a JSON error response. Past that point the response is always an event
/// stream, and failures are reported as `error` events.
///
/// # Errors
///
/// Returns `AppError::Validation` for malformed bodies or agendas.
pub async fn start_meeting_stream(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response> {
    let request = parse_start_request(&body)?;
    agenda::validate_version(request.agenda_version)?;
    let agenda = agenda::normalize(request.agenda)?;

    let meeting = Meeting::new(
        request.requested_by,
        request.agenda_version,
        agenda.display.clone(),
    );
    let meeting_id = meeting.id.clone();
    let span = info_span!("start_meeting", meeting_id = %meeting_id);

    let rx = async {
        match start(&state, &meeting, &agenda).await {
            Ok(job) => {
                info!(sections = agenda.sections.len(), "meeting started");
                let synchronizer = Synchronizer::new(
                    job,
                    state.store.clone(),
                    state.worker.clone(),
                    &agenda.display,
                );
                let initial = agenda
                    .display
                    .iter()
                    .map(|section| StreamEvent::agenda(&meeting_id, section))
                    .collect();
                let settings = SessionSettings::from(&state.config.stream);
                StreamSession::open(synchronizer, initial, settings, &state.shutdown).1
            }
            Err(err) => {
                error!(%err, "meeting could not be started");
                StreamSession::failed(&meeting_id, START_FAILURE_MESSAGE).1
            }
        }
    }
    .instrument(span)
    .await;

    Ok(event_stream_response(&meeting_id, rx))
}

async fn start(state: &AppState, meeting: &Meeting, agenda: &NormalizedAgenda) -> Result<JobHandle> {
    state.store.create_meeting(meeting).await?;
    state.worker.enqueue(&meeting.id, &agenda.sections).await
}

/// Handler for `GET /meetings/{id}`: out-of-band status lookup.
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown meetings.
pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(meeting_id): Path<String>,
) -> Result<Json<MeetingStatusView>> {
    let meeting = state.store.get_meeting(&meeting_id).await?;
    let activity = state.store.count_activity(&meeting_id).await?;
    Ok(Json(MeetingStatusView { meeting, activity }))
}

/// Wrap a frame receiver in a `text/event-stream` response.
fn event_stream_response(meeting_id: &str, rx: mpsc::Receiver<Bytes>) -> Response {
    let frames = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|frame| (Ok::<Bytes, Infallible>(frame), rx))
    });

    let mut response = Body::from_stream(frames).into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    if let Ok(value) = HeaderValue::from_str(meeting_id) {
        headers.insert("x-meeting-id", value);
    }
    response
}
