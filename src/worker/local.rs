//! In-process meeting worker.
//!
//! Each enqueued meeting runs as its own tokio task that walks the agenda in
//! order, writing section transitions, persona turns and action items to the
//! `SQLite` store, then the summary, metrics and `ended_at`. Job status is
//! kept in a shared registry that the stream sessions poll.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::composer::TurnComposer;
use super::{JobHandle, JobStatus, MeetingWorker};
use crate::models::action_item::{ActionItem, Priority};
use crate::models::agenda::{AgendaEntry, SectionStatus};
use crate::models::turn::{PersonaTurn, TurnContent};
use crate::persistence::action_item_repo::ActionItemRepo;
use crate::persistence::db::Database;
use crate::persistence::meeting_repo::MeetingRepo;
use crate::persistence::turn_repo::TurnRepo;
use crate::store::BoxFuture;
use crate::{AppError, Result};

/// Finished jobs are forgotten after this long.
const FINISHED_JOB_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct JobRecord {
    status: JobStatus,
    finished_at: Option<Instant>,
}

/// Thread-safe map of job records keyed by `job_id`.
type JobRegistry = Arc<Mutex<HashMap<String, JobRecord>>>;

/// Worker that produces meeting content inside the server process.
pub struct LocalWorker {
    meetings: MeetingRepo,
    turns: TurnRepo,
    action_items: ActionItemRepo,
    composer: Arc<dyn TurnComposer>,
    step_delay: Duration,
    jobs: JobRegistry,
    cancel: CancellationToken,
}

impl LocalWorker {
    /// Create a worker writing to `db`.
    ///
    /// `step_delay` paces the job between observable steps; `cancel` stops
    /// all running jobs (they are reported as failed).
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        composer: Arc<dyn TurnComposer>,
        step_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            meetings: MeetingRepo::new(Arc::clone(&db)),
            turns: TurnRepo::new(Arc::clone(&db)),
            action_items: ActionItemRepo::new(db),
            composer,
            step_delay,
            jobs: JobRegistry::default(),
            cancel,
        }
    }

    /// Number of jobs currently tracked (running or recently finished).
    pub async fn tracked_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }

    fn job_run(&self, meeting_id: &str, agenda: &[AgendaEntry]) -> JobRun {
        JobRun {
            meeting_id: meeting_id.to_owned(),
            agenda: agenda.to_vec(),
            meetings: self.meetings.clone(),
            turns: self.turns.clone(),
            action_items: self.action_items.clone(),
            composer: Arc::clone(&self.composer),
            step_delay: self.step_delay,
        }
    }
}

impl MeetingWorker for LocalWorker {
    fn enqueue<'a>(
        &'a self,
        meeting_id: &'a str,
        agenda: &'a [AgendaEntry],
    ) -> BoxFuture<'a, JobHandle> {
        Box::pin(async move {
            if self.cancel.is_cancelled() {
                return Err(AppError::Worker("worker is shutting down".into()));
            }

            let handle = JobHandle::new(meeting_id);
            {
                let mut jobs = self.jobs.lock().await;
                jobs.retain(|_, record| {
                    record
                        .finished_at
                        .is_none_or(|at| at.elapsed() < FINISHED_JOB_TTL)
                });
                jobs.insert(
                    handle.job_id.clone(),
                    JobRecord {
                        status: JobStatus::Running,
                        finished_at: None,
                    },
                );
            }

            let run = self.job_run(meeting_id, agenda);
            let jobs = Arc::clone(&self.jobs);
            let cancel = self.cancel.child_token();
            let job_id = handle.job_id.clone();

            tokio::spawn(
                async move {
                    let outcome = tokio::select! {
                        () = cancel.cancelled() => Err(AppError::Worker("worker shut down".into())),
                        result = run.execute() => result,
                    };

                    let status = match outcome {
                        Ok(()) => {
                            info!("meeting job completed");
                            JobStatus::Completed
                        }
                        Err(err) => {
                            warn!(%err, "meeting job failed");
                            if let Err(mark_err) = run.meetings.mark_failed(&run.meeting_id).await
                            {
                                warn!(%mark_err, "failed to record meeting failure");
                            }
                            JobStatus::Failed {
                                reason: err.to_string(),
                            }
                        }
                    };

                    jobs.lock().await.insert(
                        job_id,
                        JobRecord {
                            status,
                            finished_at: Some(Instant::now()),
                        },
                    );
                }
                .instrument(info_span!("meeting_job", meeting_id = %meeting_id)),
            );

            info!(meeting_id, job_id = %handle.job_id, "meeting job enqueued");
            Ok(handle)
        })
    }

    fn job_status<'a>(&'a self, job: &'a JobHandle) -> BoxFuture<'a, JobStatus> {
        Box::pin(async move {
            self.jobs
                .lock()
                .await
                .get(&job.job_id)
                .map(|record| record.status.clone())
                .ok_or_else(|| AppError::NotFound(format!("job {} not found", job.job_id)))
        })
    }
}

/// Everything one job needs, detached from the worker.
struct JobRun {
    meeting_id: String,
    agenda: Vec<AgendaEntry>,
    meetings: MeetingRepo,
    turns: TurnRepo,
    action_items: ActionItemRepo,
    composer: Arc<dyn TurnComposer>,
    step_delay: Duration,
}

impl JobRun {
    async fn execute(&self) -> Result<()> {
        let started = Instant::now();
        let meeting_id = self.meeting_id.as_str();
        let mut contents: Vec<TurnContent> = Vec::with_capacity(self.agenda.len());
        let mut action_item_count = 0_usize;

        for section in &self.agenda {
            self.meetings
                .update_section_status(meeting_id, &section.id, SectionStatus::InProgress)
                .await?;
            self.pause().await;

            let content = self.composer.compose(meeting_id, section).await?;
            let sequence = self.turns.next_sequence(meeting_id).await?;
            self.turns
                .append(&PersonaTurn {
                    meeting_id: meeting_id.to_owned(),
                    sequence,
                    persona_id: section.persona_id.clone(),
                    section_id: Some(section.id.clone()),
                    created_at: Utc::now(),
                    content: content.clone(),
                })
                .await?;

            if let Some(recommendation) = content.recommendations.first() {
                let mut item =
                    ActionItem::new(meeting_id.to_owned(), recommendation.clone(), Priority::Medium);
                item.assignee = Some(section.persona_id.clone());
                self.action_items.create(&item).await?;
                action_item_count += 1;
            }

            self.meetings
                .update_section_status(meeting_id, &section.id, SectionStatus::Completed)
                .await?;
            contents.push(content);
            self.pause().await;
        }

        let summary = self.composer.summarize(&self.agenda, &contents);
        self.meetings.set_summary(meeting_id, &summary).await?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let metrics = json!({
            "sections": self.agenda.len(),
            "turns": contents.len(),
            "actionItems": action_item_count,
            "durationMs": duration_ms,
        });
        self.meetings.set_metrics(meeting_id, &metrics).await?;

        self.meetings.mark_ended(meeting_id, Utc::now()).await
    }

    async fn pause(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }
}
