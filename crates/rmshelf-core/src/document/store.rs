//! The document store seam.

use std::future::Future;

use super::model::{CandidateScan, DocumentId, FolderId, FolderRecord};
use super::patterns::SourcePatterns;
use crate::Result;

/// Access to the reader application's document records.
///
/// Implementations must keep every write a single atomic per-record
/// operation so an interrupted call never leaves a corrupt record behind.
pub trait DocumentStore {
    /// List documents whose display name matches `patterns`.
    ///
    /// Deleted documents, folders and trashed documents are never returned.
    /// Per-document read failures are reported in the scan; an `Err` means
    /// the store as a whole could not be read.
    fn list_candidate_documents(
        &self,
        patterns: &SourcePatterns,
    ) -> impl Future<Output = Result<CandidateScan>> + Send;

    /// List live (not deleted, not trashed) folders.
    fn list_folders(&self) -> impl Future<Output = Result<Vec<FolderRecord>>> + Send;

    /// Create a folder named `name` inside `parent` and return its id.
    fn create_folder(
        &self,
        name: &str,
        parent: &FolderId,
    ) -> impl Future<Output = Result<FolderId>> + Send;

    /// Set the parent folder of a document.
    ///
    /// Repeating the call with the same destination is a no-op success.
    fn move_document(
        &self,
        id: &DocumentId,
        destination: &FolderId,
    ) -> impl Future<Output = Result<()>> + Send;
}
