//! Append-only JSON-lines journal of published values and cycle events.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::Mutex;
use tracing::warn;

pub type SharedJournal = Arc<Mutex<PublishJournal>>;

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct PublishJournal {
    path: PathBuf,
    file: File,
}

impl PublishJournal {
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn write_event(&mut self, event: serde_json::Value) {
        let write_result = (|| -> std::io::Result<()> {
            let line = serde_json::to_string(&event)?;
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Journal write to {} failed: {}", self.path.display(), e);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write an event if a journal is configured.
pub async fn write_event(journal: Option<&SharedJournal>, event: serde_json::Value) {
    if let Some(journal) = journal {
        journal.lock().await.write_event(event);
    }
}
