//! Tracked state storage repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::model::{ReadingStatus, SignalsSnapshot, TrackedState, Transition};
use crate::document::DocumentId;
use crate::fsio::{bounded, read_optional, write_atomic};
use crate::{Error, Result};

/// Format version written to the state file.
pub const STATE_FILE_VERSION: u32 = 1;

/// Rule name recorded when a damaged entry's status is recovered.
const RECOVERED_RULE: &str = "recovered";

#[derive(Serialize)]
struct StateFile<'a> {
    version: u32,
    documents: &'a BTreeMap<DocumentId, TrackedState>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    quarantined: &'a BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawStateFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    documents: BTreeMap<String, Value>,
    #[serde(default)]
    quarantined: BTreeMap<String, Value>,
}

/// Repository for per-document tracked state.
///
/// The whole state lives in memory and is written as one JSON file. Every
/// write replaces the file atomically, so a crash mid-persist leaves the
/// previous valid state in place. Entries are never deleted.
#[derive(Debug)]
pub struct StateRepository {
    path: Option<PathBuf>,
    io_timeout: Duration,
    documents: BTreeMap<DocumentId, TrackedState>,
    quarantined: BTreeMap<String, Value>,
    dirty: bool,
}

impl StateRepository {
    /// Open the repository stored at `path`.
    ///
    /// A missing file starts an empty repository. A file that cannot be
    /// parsed is kept beside the original as `<name>.corrupt-<timestamp>`
    /// and tracking starts over. Individual damaged entries keep their
    /// status when it can be recovered and are quarantined otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, was written
    /// by a newer version, or a corrupt file cannot be set aside.
    pub async fn open(path: impl Into<PathBuf>, io_timeout: Duration) -> Result<Self> {
        let path = path.into();
        let mut repo = Self {
            path: Some(path.clone()),
            io_timeout,
            documents: BTreeMap::new(),
            quarantined: BTreeMap::new(),
            dirty: false,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            bounded(io_timeout, tokio::fs::create_dir_all(parent))
                .await
                .map_err(|e| {
                    Error::StateRepository(format!("cannot create {}: {e}", parent.display()))
                })?;
        }

        let Some(bytes) = read_optional(&path, io_timeout)
            .await
            .map_err(|e| Error::StateRepository(format!("cannot read {}: {e}", path.display())))?
        else {
            info!(path = %path.display(), "No saved state, starting fresh");
            return Ok(repo);
        };

        let raw: RawStateFile = match serde_json::from_slice(&bytes) {
            Ok(raw) => raw,
            Err(e) => {
                let backup = set_aside(&path, io_timeout).await?;
                error!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Saved state is corrupt; kept a copy and starting fresh"
                );
                repo.dirty = true;
                return Ok(repo);
            }
        };

        if raw.version > STATE_FILE_VERSION {
            return Err(Error::StateRepository(format!(
                "{} was written by a newer version (format {})",
                path.display(),
                raw.version
            )));
        }

        repo.load_entries(raw, Utc::now());
        debug!(path = %path.display(), documents = repo.documents.len(), "Loaded saved state");
        Ok(repo)
    }

    /// Create a repository that is never written to disk.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            path: None,
            io_timeout: Duration::from_secs(10),
            documents: BTreeMap::new(),
            quarantined: BTreeMap::new(),
            dirty: false,
        }
    }

    fn load_entries(&mut self, raw: RawStateFile, now: DateTime<Utc>) {
        self.quarantined = raw.quarantined;

        for (key, value) in raw.documents {
            let id = DocumentId::new(key.clone());
            match serde_json::from_value::<TrackedState>(value.clone()) {
                Ok(state) if state.document_id == id => {
                    self.documents.insert(id, state);
                }
                parsed => {
                    let reason = parsed.err().map_or_else(
                        || "document id does not match its key".to_string(),
                        |e| e.to_string(),
                    );
                    if let Some(state) = salvage(&id, &value, now) {
                        warn!(
                            %id,
                            status = %state.current_status,
                            error = %reason,
                            "Recovered damaged state entry; signals will be re-derived"
                        );
                        self.documents.insert(id, state);
                    } else {
                        warn!(
                            %id,
                            error = %reason,
                            "Quarantined unrecoverable state entry; document will be re-classified"
                        );
                        self.quarantined.insert(key, value);
                    }
                    self.dirty = true;
                }
            }
        }
    }

    /// Path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// State of one document.
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<&TrackedState> {
        self.documents.get(id)
    }

    /// Iterate over all tracked documents in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedState> {
        self.documents.values()
    }

    /// Number of tracked documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no document is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns true if an unrecoverable entry for `id` is held in quarantine.
    #[must_use]
    pub fn is_quarantined(&self, id: &DocumentId) -> bool {
        self.quarantined.contains_key(id.as_str())
    }

    /// Returns true if there are changes not yet persisted.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert or replace a document's state.
    ///
    /// Returns true if anything changed.
    pub fn upsert(&mut self, state: TrackedState) -> bool {
        if self.documents.get(&state.document_id) == Some(&state) {
            return false;
        }
        self.documents.insert(state.document_id.clone(), state);
        self.dirty = true;
        true
    }

    /// Write pending changes to disk.
    ///
    /// Does nothing if there are no changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written. The previous file is
    /// left intact and the changes stay pending.
    pub async fn persist(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        let file = StateFile {
            version: STATE_FILE_VERSION,
            documents: &self.documents,
            quarantined: &self.quarantined,
        };
        let bytes = serde_json::to_vec_pretty(&file)?;

        write_atomic(path, bytes, self.io_timeout)
            .await
            .map_err(|e| Error::StateRepository(format!("cannot write {}: {e}", path.display())))?;

        self.dirty = false;
        debug!(path = %path.display(), documents = self.documents.len(), "Persisted state");
        Ok(())
    }
}

/// Renames a corrupt state file out of the way and returns its new path.
async fn set_aside(path: &Path, io_timeout: Duration) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map_or_else(|| "state".into(), |n| n.to_string_lossy().into_owned());
    let backup = path.with_file_name(format!(
        "{name}.corrupt-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
    ));

    bounded(io_timeout, tokio::fs::rename(path, &backup))
        .await
        .map_err(|e| {
            Error::StateRepository(format!(
                "{} is corrupt and could not be set aside: {e}",
                path.display()
            ))
        })?;
    Ok(backup)
}

/// Rebuilds what can be trusted from a damaged entry: its status and
/// history. Signals start over and are re-derived on the next cycle.
fn salvage(id: &DocumentId, raw: &Value, now: DateTime<Utc>) -> Option<TrackedState> {
    let status = raw
        .get("current_status")?
        .as_str()
        .and_then(ReadingStatus::parse)?;

    let mut history: Vec<Transition> = raw
        .get("transition_history")
        .and_then(|h| serde_json::from_value(h.clone()).ok())
        .unwrap_or_default();
    history.retain(|t| t.status <= status);

    if status != ReadingStatus::Unclassified && !history.iter().any(|t| t.status == status) {
        history.push(Transition {
            status,
            at: now,
            rule: RECOVERED_RULE.to_string(),
        });
    }

    let timestamp = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    };
    let first_seen_at = timestamp("first_seen_at")
        .or_else(|| history.first().map(|t| t.at))
        .unwrap_or(now);

    Some(TrackedState {
        document_id: id.clone(),
        first_seen_at,
        last_classified_at: timestamp("last_classified_at").unwrap_or(now),
        current_status: status,
        signals: SignalsSnapshot::default(),
        last_opened_at: None,
        transition_history: history,
    })
}
