//! JSON-lines run history.
//!
//! Every event is appended to `events.jsonl`, the chronological log, and to a
//! per-kind file (`test_execution.jsonl` or `bugs.jsonl`) for cheap queries.
//! The directory is created on first write.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::models::HistoryEvent;
use crate::domain::ports::RunHistory;

/// Chronological log of every event
pub const EVENTS_FILE: &str = "events.jsonl";

/// Test-run events only
pub const TEST_EXECUTION_FILE: &str = "test_execution.jsonl";

/// Bug events only
pub const BUGS_FILE: &str = "bugs.jsonl";

/// Run history stored as JSON lines under one directory
pub struct JsonlHistory {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistory {
    /// History rooted at `dir`. Nothing touches the disk until the first event.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory the history lives in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append(&self, event: &HistoryEvent) -> Result<()> {
        let mut line = serde_json::to_string(event).context("failed to serialize history event")?;
        line.push('\n');

        let kind_file = match event {
            HistoryEvent::TestExecution(_) => TEST_EXECUTION_FILE,
            HistoryEvent::BugDiscovered(_) => BUGS_FILE,
        };

        // Keeps lines whole when events arrive concurrently
        let _guard = self.write_lock.lock().await;

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create history directory {}", self.dir.display()))?;

        for file in [EVENTS_FILE, kind_file] {
            let path = self.dir.join(file);
            let mut handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            handle
                .write_all(line.as_bytes())
                .await
                .with_context(|| format!("failed to append to {}", path.display()))?;
            handle.flush().await?;
        }

        Ok(())
    }

    /// Read every event from the chronological log under `dir`.
    ///
    /// A missing log reads as empty. Lines that do not parse are skipped.
    pub async fn read_events(dir: impl AsRef<Path>) -> Result<Vec<HistoryEvent>> {
        let path = dir.as_ref().join(EVENTS_FILE);

        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let mut events = Vec::new();
        for (n, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(file = %path.display(), line = n + 1, error = %e, "Skipping malformed history line"),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl RunHistory for JsonlHistory {
    async fn record(&self, event: HistoryEvent) {
        match self.append(&event).await {
            Ok(()) => debug!(dir = %self.dir.display(), run_id = %event.run_id(), "History event recorded"),
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to record history event"),
        }
    }
}
