//! Job state: the `scanning → complete` protocol seen by an observer.
//!
//! A scan is started for a *target* (the document being scanned; in the
//! browser build this is a tab). [`JobRunner::run`] writes a `scanning`
//! state, runs the pipeline, and writes exactly one `complete` state
//! carrying the finished report. There is no failed state. A new run for the
//! same target overwrites whatever was stored before, so the last write wins.
//!
//! The store is injected as an `Arc<dyn JobStore>` into both the runner and
//! the observer ([`crate::stream::watch_target`]). Change notifications go
//! through a broadcast channel owned by the store, so nothing listens on
//! ambient global state.
//!
//! Re-entry is not guarded here. The surface that starts runs should check
//! [`JobRunner::is_scanning`] first.

use crate::config::ScanConfig;
use crate::error::OrderTallyError;
use crate::output::ScanOutput;
use crate::pipeline::render::Report;
use crate::scan::scan;
use crate::source::LineSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Buffered notifications per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 64;

// ── Types ────────────────────────────────────────────────────────────────────

/// Identity of a scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the target's state is stored.
    pub fn storage_key(&self) -> String {
        format!("stats_{}", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Ordered by progress: `Scanning < Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Scanning,
    Complete,
}

/// Persisted state of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,
    /// Present only once the job is complete.
    pub report: Option<Report>,
    pub timestamp: DateTime<Utc>,
}

impl JobState {
    /// State written when a run starts.
    pub fn scanning() -> Self {
        Self {
            status: JobStatus::Scanning,
            report: None,
            timestamp: Utc::now(),
        }
    }

    /// The single transition out of `scanning`.
    pub fn complete(self, report: Report) -> Self {
        debug_assert_eq!(self.status, JobStatus::Scanning);
        Self {
            status: JobStatus::Complete,
            report: Some(report),
            timestamp: Utc::now(),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.status == JobStatus::Scanning
    }
}

/// A change notification: `target` now has `state`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub target: TargetId,
    pub state: JobState,
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Keyed job-state storage with change notifications.
///
/// Every successful `write` is published to all current subscribers.
pub trait JobStore: Send + Sync {
    fn write(&self, target: &TargetId, state: JobState) -> Result<(), OrderTallyError>;

    fn read(&self, target: &TargetId) -> Result<Option<JobState>, OrderTallyError>;

    fn subscribe(&self) -> broadcast::Receiver<JobUpdate>;
}

/// Broadcast side shared by the store implementations.
#[derive(Debug)]
struct UpdateFeed {
    tx: broadcast::Sender<JobUpdate>,
}

impl UpdateFeed {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    fn publish(&self, target: &TargetId, state: JobState) {
        // No subscribers is fine; the state is still stored.
        let _ = self.tx.send(JobUpdate {
            target: target.clone(),
            state,
        });
    }

    fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.tx.subscribe()
    }
}

/// In-process store; state lives as long as the store.
#[derive(Debug)]
pub struct MemoryJobStore {
    states: Mutex<HashMap<TargetId, JobState>>,
    feed: UpdateFeed,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            feed: UpdateFeed::new(),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for MemoryJobStore {
    fn write(&self, target: &TargetId, state: JobState) -> Result<(), OrderTallyError> {
        let mut states = self.states.lock().map_err(|_| OrderTallyError::StoreWrite {
            target: target.to_string(),
            detail: "state map lock poisoned".into(),
        })?;
        states.insert(target.clone(), state.clone());
        drop(states);
        self.feed.publish(target, state);
        Ok(())
    }

    fn read(&self, target: &TargetId) -> Result<Option<JobState>, OrderTallyError> {
        let states = self.states.lock().map_err(|_| OrderTallyError::StoreRead {
            target: target.to_string(),
            detail: "state map lock poisoned".into(),
        })?;
        Ok(states.get(target).cloned())
    }

    fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.feed.subscribe()
    }
}

/// Store that keeps one JSON file per target in a directory.
///
/// Writes go to a temp file in the same directory and are renamed into
/// place, so a reader never sees half a state. Bytes outside
/// `[A-Za-z0-9_-]` in the storage key are percent-encoded in the file name,
/// so distinct targets never share a file.
#[derive(Debug)]
pub struct FileJobStore {
    dir: PathBuf,
    feed: UpdateFeed,
}

impl FileJobStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, OrderTallyError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| OrderTallyError::OutputWriteFailed {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            feed: UpdateFeed::new(),
        })
    }

    pub fn path_for(&self, target: &TargetId) -> PathBuf {
        let mut name = String::new();
        for byte in target.storage_key().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{name}.json"))
    }
}

impl JobStore for FileJobStore {
    fn write(&self, target: &TargetId, state: JobState) -> Result<(), OrderTallyError> {
        let store_err = |detail: String| OrderTallyError::StoreWrite {
            target: target.to_string(),
            detail,
        };

        let json = serde_json::to_vec_pretty(&state).map_err(|e| store_err(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| store_err(e.to_string()))?;
        tmp.write_all(&json).map_err(|e| store_err(e.to_string()))?;
        let path = self.path_for(target);
        tmp.persist(&path).map_err(|e| store_err(e.to_string()))?;
        debug!("Stored {:?} state for {} at {}", state.status, target, path.display());

        self.feed.publish(target, state);
        Ok(())
    }

    fn read(&self, target: &TargetId) -> Result<Option<JobState>, OrderTallyError> {
        let path = self.path_for(target);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(OrderTallyError::StoreRead {
                    target: target.to_string(),
                    detail: e.to_string(),
                })
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| OrderTallyError::StoreRead {
                target: target.to_string(),
                detail: e.to_string(),
            })
    }

    fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.feed.subscribe()
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

/// Wraps a scan with the `scanning → complete` protocol.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    config: ScanConfig,
}

impl JobRunner {
    pub fn new(store: Arc<dyn JobStore>, config: ScanConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// True while the last run started for `target` has not completed.
    pub fn is_scanning(&self, target: &TargetId) -> Result<bool, OrderTallyError> {
        Ok(self
            .store
            .read(target)?
            .is_some_and(|s| s.is_scanning()))
    }

    /// Run the full pipeline for `target`.
    ///
    /// The observer sees `scanning`, then one `complete` with the finished
    /// report. Errors come only from the store.
    pub async fn run<S: LineSource>(
        &self,
        target: &TargetId,
        source: &mut S,
    ) -> Result<ScanOutput, OrderTallyError> {
        let started = JobState::scanning();
        self.store.write(target, started.clone())?;
        info!("Job started for target {}", target);

        let output = scan(source, &self.config).await;

        self.store.write(target, started.complete(output.report.clone()))?;
        info!(
            "Job complete for target {}: {} orders",
            target, output.aggregate.order_count
        );
        Ok(output)
    }
}
