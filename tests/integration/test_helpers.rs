//! Shared test helpers for integration tests.
//!
//! Provides the in-memory application state, an ephemeral-port server,
//! frame decoding, and scriptable fake store/worker implementations used to
//! drive stream sessions through specific termination paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use meeting_relay::config::GlobalConfig;
use meeting_relay::http::{server, AppState};
use meeting_relay::models::action_item::ActionItem;
use meeting_relay::models::agenda::AgendaEntry;
use meeting_relay::models::meeting::Meeting;
use meeting_relay::models::turn::PersonaTurn;
use meeting_relay::persistence::db;
use meeting_relay::persistence::sqlite_store::SqliteMeetingStore;
use meeting_relay::store::{ActivityCounts, BoxFuture, MeetingStore};
use meeting_relay::stream::{SessionSettings, StreamEvent};
use meeting_relay::worker::composer::TemplateComposer;
use meeting_relay::worker::local::LocalWorker;
use meeting_relay::worker::{JobHandle, JobStatus, MeetingWorker};
use meeting_relay::AppError;

// ── Configuration and state ─────────────────────────────────

/// Build a `GlobalConfig` with an in-memory database and fast cadences.
pub fn test_config() -> GlobalConfig {
    let toml = r#"
db_path = ":memory:"
http_port = 0

[stream]
poll_interval_ms = 20
heartbeat_interval_seconds = 1
channel_capacity = 64

[worker]
turn_delay_ms = 5
"#;
    GlobalConfig::from_toml_str(toml).expect("valid test config")
}

/// Session settings with a fast poll and a slow heartbeat.
pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        poll_interval: Duration::from_millis(20),
        heartbeat_interval: Duration::from_secs(30),
        max_session: None,
        channel_capacity: 64,
    }
}

/// Build a complete `AppState` backed by in-memory `SQLite` and the local worker.
pub async fn test_app_state(config: GlobalConfig) -> Arc<AppState> {
    let pool = Arc::new(db::connect_memory().await.expect("db connect"));
    let shutdown = CancellationToken::new();
    let worker = LocalWorker::new(
        Arc::clone(&pool),
        Arc::new(TemplateComposer),
        config.worker.turn_delay(),
        shutdown.child_token(),
    );
    Arc::new(AppState {
        config: Arc::new(config),
        store: Arc::new(SqliteMeetingStore::new(pool)),
        worker: Arc::new(worker),
        shutdown,
    })
}

/// Build an `AppState` around the given store and worker.
pub fn fake_app_state(store: Arc<FakeStore>, worker: Arc<FakeWorker>) -> Arc<AppState> {
    Arc::new(AppState {
        config: Arc::new(test_config()),
        store,
        worker,
        shutdown: CancellationToken::new(),
    })
}

/// Serve `state` on an ephemeral port, returning the base URL.
///
/// Cancelling `state.shutdown` stops the server.
pub async fn spawn_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral");
    let addr = listener.local_addr().expect("local addr");
    let ct = state.shutdown.clone();
    tokio::spawn(async move {
        let _ = server::serve_listener(listener, state, ct).await;
    });
    format!("http://{addr}")
}

// ── Frame decoding ──────────────────────────────────────────

/// Parse every `data:` record in `text`, skipping comment frames.
pub fn parse_events(text: &str) -> Vec<StreamEvent> {
    text.split("\n\n")
        .filter_map(|record| record.strip_prefix("data: "))
        .map(|json| serde_json::from_str(json).expect("event json"))
        .collect()
}

/// Drain `rx` until the session ends its body, or panic after `limit`.
pub async fn drain(rx: &mut mpsc::Receiver<Bytes>, limit: Duration) -> String {
    tokio::time::timeout(limit, async {
        let mut text = String::new();
        while let Some(frame) = rx.recv().await {
            text.push_str(std::str::from_utf8(&frame).expect("utf8 frame"));
        }
        text
    })
    .await
    .expect("stream ended in time")
}

/// Poll `condition` every few milliseconds until it holds, or panic.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached in time");
}

// ── Fake store ──────────────────────────────────────────────

/// Scripted store contents.
#[derive(Default)]
pub struct FakeContents {
    pub meeting: Option<Meeting>,
    pub turns: Vec<PersonaTurn>,
    pub action_items: Vec<ActionItem>,
}

/// In-memory store whose contents tests edit directly.
#[derive(Default)]
pub struct FakeStore {
    pub contents: Mutex<FakeContents>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_create: AtomicBool,
    read_delay: Mutex<Duration>,
}

impl FakeStore {
    /// Store holding `meeting`.
    pub fn with_meeting(meeting: Meeting) -> Arc<Self> {
        let store = Self::default();
        store.contents.lock().unwrap().meeting = Some(meeting);
        Arc::new(store)
    }

    /// Apply `edit` to the scripted contents.
    pub fn edit(&self, edit: impl FnOnce(&mut FakeContents)) {
        edit(&mut self.contents.lock().unwrap());
    }

    /// Number of `get_meeting` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Make `create_meeting` fail.
    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    /// Delay every `get_meeting` call.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    fn check_reads(&self) -> meeting_relay::Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Db("database is locked".into()));
        }
        Ok(())
    }
}

impl MeetingStore for FakeStore {
    fn create_meeting<'a>(&'a self, meeting: &'a Meeting) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(AppError::Db("disk full".into()));
            }
            self.edit(|c| c.meeting = Some(meeting.clone()));
            Ok(())
        })
    }

    fn get_meeting<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, Meeting> {
        Box::pin(async move {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let delay = *self.read_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.check_reads()?;
            self.contents
                .lock()
                .unwrap()
                .meeting
                .clone()
                .filter(|m| m.id == meeting_id)
                .ok_or_else(|| AppError::NotFound(format!("meeting {meeting_id} not found")))
        })
    }

    fn list_turns_after<'a>(
        &'a self,
        _meeting_id: &'a str,
        after: i64,
    ) -> BoxFuture<'a, Vec<PersonaTurn>> {
        Box::pin(async move {
            self.check_reads()?;
            Ok(self
                .contents
                .lock()
                .unwrap()
                .turns
                .iter()
                .filter(|t| t.sequence > after)
                .cloned()
                .collect())
        })
    }

    fn list_action_items_excluding<'a>(
        &'a self,
        _meeting_id: &'a str,
        exclude: &'a HashSet<String>,
    ) -> BoxFuture<'a, Vec<ActionItem>> {
        Box::pin(async move {
            self.check_reads()?;
            Ok(self
                .contents
                .lock()
                .unwrap()
                .action_items
                .iter()
                .filter(|i| !exclude.contains(&i.id))
                .cloned()
                .collect())
        })
    }

    fn count_activity<'a>(&'a self, _meeting_id: &'a str) -> BoxFuture<'a, ActivityCounts> {
        Box::pin(async move {
            let contents = self.contents.lock().unwrap();
            Ok(ActivityCounts {
                turns: i64::try_from(contents.turns.len()).unwrap(),
                action_items: i64::try_from(contents.action_items.len()).unwrap(),
            })
        })
    }
}

// ── Fake worker ─────────────────────────────────────────────

/// Worker whose job status tests set directly.
pub struct FakeWorker {
    status: Mutex<JobStatus>,
    reject: AtomicBool,
}

impl Default for FakeWorker {
    fn default() -> Self {
        Self {
            status: Mutex::new(JobStatus::Running),
            reject: AtomicBool::new(false),
        }
    }
}

impl FakeWorker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, status: JobStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Make `enqueue` fail.
    pub fn reject_jobs(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }
}

impl MeetingWorker for FakeWorker {
    fn enqueue<'a>(
        &'a self,
        meeting_id: &'a str,
        _agenda: &'a [AgendaEntry],
    ) -> BoxFuture<'a, JobHandle> {
        Box::pin(async move {
            if self.reject.load(Ordering::SeqCst) {
                return Err(AppError::Worker("queue full".into()));
            }
            Ok(JobHandle::new(meeting_id))
        })
    }

    fn job_status<'a>(&'a self, _job: &'a JobHandle) -> BoxFuture<'a, JobStatus> {
        Box::pin(async move { Ok(self.status.lock().unwrap().clone()) })
    }
}
