//--------------------------------------------------------------------------------------------------
// STRUCTS & TRAITS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods       |
// |-------------------------|---------------------------------------------------|-------------------|
// | EventHandler            | Trait for event handling                          | handle_event      |
// | EventLogger             | Bounded in-memory history of events               | get_history       |
// | JournalEventHandler     | Appends events to rotating JSONL files            | write_event       |
//--------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use super::event_types::{EventError, EventResult, MatchingEngineEvent};

/// Event handler trait for processing events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Returns the types of events this handler processes
    fn event_types(&self) -> Vec<&'static str>;

    /// Processes an event
    async fn handle_event(&self, event: MatchingEngineEvent) -> EventResult<()>;
}

/// A simple in-memory event logger for debugging
pub struct EventLogger {
    /// Maximum number of events to keep in history
    max_history: usize,
    /// Event history, oldest first
    history: RwLock<VecDeque<MatchingEngineEvent>>,
}

impl EventLogger {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: RwLock::new(VecDeque::with_capacity(max_history)),
        }
    }

    /// Returns the event history, oldest first
    pub async fn get_history(&self) -> Vec<MatchingEngineEvent> {
        self.history.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl EventHandler for EventLogger {
    fn event_types(&self) -> Vec<&'static str> {
        MatchingEngineEvent::ALL_TYPES.to_vec()
    }

    async fn handle_event(&self, event: MatchingEngineEvent) -> EventResult<()> {
        debug!(
            event_type = event.event_type(),
            at = %event.timestamp(),
            "event logged"
        );
        let mut history = self.history.write().await;

        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(event);

        Ok(())
    }
}

/// Open journal file and the number of events written to it
struct JournalFile {
    file: File,
    events: usize,
}

/// Writes every event as one JSON line to files under `output_dir`.
///
/// A new file is started after `max_events_per_file` events. File names embed
/// the creation time, so a directory listing sorts them in write order.
pub struct JournalEventHandler {
    /// Directory to store event files
    output_dir: PathBuf,
    /// Maximum events per file before rotation
    max_events_per_file: usize,
    /// File currently being appended to
    current: Mutex<Option<JournalFile>>,
}

impl JournalEventHandler {
    /// Creates a new journal handler, creating `output_dir` if needed.
    ///
    /// # Errors
    /// Returns the I/O error if the directory cannot be created
    pub fn new<P: AsRef<Path>>(output_dir: P, max_events_per_file: usize) -> std::io::Result<Self> {
        let path = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            output_dir: path,
            max_events_per_file: max_events_per_file.max(1),
            current: Mutex::new(None),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn open_new_file(&self) -> std::io::Result<JournalFile> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%6f");
        let path = self.output_dir.join(format!("events_{}.jsonl", timestamp));

        debug!("Opening new event file: {:?}", path);
        let file = File::create(path).await?;

        Ok(JournalFile { file, events: 0 })
    }

    async fn write_event(&self, event: &MatchingEngineEvent) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut guard = self.current.lock().await;
        let rotate = guard
            .as_ref()
            .is_none_or(|journal| journal.events >= self.max_events_per_file);
        if rotate {
            *guard = Some(self.open_new_file().await?);
        }

        if let Some(journal) = guard.as_mut() {
            journal.file.write_all(&line).await?;
            journal.file.flush().await?;
            journal.events += 1;
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JournalEventHandler {
    fn event_types(&self) -> Vec<&'static str> {
        MatchingEngineEvent::ALL_TYPES.to_vec()
    }

    async fn handle_event(&self, event: MatchingEngineEvent) -> EventResult<()> {
        self.write_event(&event).await.map_err(|e| {
            error!("Failed to persist event: {}", e);
            EventError::ProcessingError(format!("Failed to persist event: {}", e))
        })
    }
}
