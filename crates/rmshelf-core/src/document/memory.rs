//! In-memory document store for tests and simulations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::model::{CandidateScan, DocumentId, DocumentRecord, FolderId, FolderRecord};
use super::patterns::SourcePatterns;
use super::store::DocumentStore;
use crate::{Error, Result};

/// A [`DocumentStore`] held entirely in memory.
///
/// Counts every applied move and can simulate unreadable records, failing
/// moves and an unreachable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<DocumentId, DocumentRecord>,
    folders: Vec<FolderRecord>,
    unreadable: BTreeSet<DocumentId>,
    failing_moves: BTreeSet<DocumentId>,
    unavailable: bool,
    moves: usize,
    next_folder: u64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a document.
    pub fn insert_document(&self, record: DocumentRecord) {
        self.lock().documents.insert(record.id.clone(), record);
    }

    /// Modify a stored document in place. Returns false if it does not exist.
    pub fn update_document(&self, id: &DocumentId, update: impl FnOnce(&mut DocumentRecord)) -> bool {
        self.lock().documents.get_mut(id).map(update).is_some()
    }

    /// Current copy of a document.
    #[must_use]
    pub fn document(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.lock().documents.get(id).cloned()
    }

    /// Add a folder and return its id.
    pub fn insert_folder(&self, name: &str, parent: &FolderId) -> FolderId {
        let mut inner = self.lock();
        inner.next_folder += 1;
        let id = FolderId::new(format!("folder-{}", inner.next_folder));
        inner.folders.push(FolderRecord {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.clone(),
        });
        id
    }

    /// Remove a folder, as if the user deleted it on the device.
    pub fn remove_folder(&self, id: &FolderId) {
        self.lock().folders.retain(|f| &f.id != id);
    }

    /// Snapshot of all folders.
    #[must_use]
    pub fn folders(&self) -> Vec<FolderRecord> {
        self.lock().folders.clone()
    }

    /// Make a document's record unreadable (or readable again).
    pub fn set_unreadable(&self, id: &DocumentId, unreadable: bool) {
        let mut inner = self.lock();
        if unreadable {
            inner.unreadable.insert(id.clone());
        } else {
            inner.unreadable.remove(id);
        }
    }

    /// Make moves of a document fail (or succeed again).
    pub fn set_move_fails(&self, id: &DocumentId, fails: bool) {
        let mut inner = self.lock();
        if fails {
            inner.failing_moves.insert(id.clone());
        } else {
            inner.failing_moves.remove(id);
        }
    }

    /// Make the whole store unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of moves that changed a document's parent.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.lock().moves
    }
}

impl DocumentStore for MemoryStore {
    async fn list_candidate_documents(&self, patterns: &SourcePatterns) -> Result<CandidateScan> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(Error::StoreUnavailable("memory store offline".to_string()));
        }

        let mut scan = CandidateScan::default();
        for (id, record) in &inner.documents {
            if inner.unreadable.contains(id) {
                scan.unreadable.push(Error::MetadataRead {
                    id: id.clone(),
                    reason: "simulated corrupt record".to_string(),
                });
            } else if !record.parent_folder_id.is_trash() && patterns.matches(&record.display_name)
            {
                scan.records.push(record.clone());
            }
        }
        Ok(scan)
    }

    async fn list_folders(&self) -> Result<Vec<FolderRecord>> {
        let inner = self.lock();
        if inner.unavailable {
            return Err(Error::StoreUnavailable("memory store offline".to_string()));
        }
        Ok(inner.folders.clone())
    }

    async fn create_folder(&self, name: &str, parent: &FolderId) -> Result<FolderId> {
        if self.lock().unavailable {
            return Err(Error::StoreUnavailable("memory store offline".to_string()));
        }
        Ok(self.insert_folder(name, parent))
    }

    async fn move_document(&self, id: &DocumentId, destination: &FolderId) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.unavailable || inner.failing_moves.contains(id) {
            return Err(Error::Move {
                id: id.clone(),
                reason: "simulated write failure".to_string(),
            });
        }

        let record = inner.documents.get_mut(id).ok_or_else(|| Error::Move {
            id: id.clone(),
            reason: "no such document".to_string(),
        })?;
        if record.parent_folder_id == *destination {
            return Ok(());
        }
        record.parent_folder_id = destination.clone();
        inner.moves += 1;
        Ok(())
    }
}
