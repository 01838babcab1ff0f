//! Document store data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Stable opaque identifier of a document in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create a new document ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a folder (a "collection" in the store).
///
/// The library root is the empty id and the trash is `trash`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    /// Id of the trash pseudo-folder.
    pub const TRASH: &'static str = "trash";

    /// Create a new folder ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The library root.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Returns true if this is the library root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if this is the trash.
    #[must_use]
    pub fn is_trash(&self) -> bool {
        self.0 == Self::TRASH
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A document as read from the external store.
///
/// The core only ever writes `parent_folder_id` back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Document identifier.
    pub id: DocumentId,
    /// Name shown in the library.
    pub display_name: String,
    /// Folder currently holding the document.
    pub parent_folder_id: FolderId,
    /// Number of pages, if the content record is available.
    pub page_count: Option<u32>,
    /// When the document was last opened on the device.
    pub last_opened: Option<DateTime<Utc>>,
    /// Annotation count per page, indexed by page position.
    pub per_page_annotation_counts: Vec<u32>,
    /// 0-based indices of bookmarked pages.
    pub bookmark_page_indices: Vec<u32>,
    /// Creation time (falls back to the last-modified time).
    pub created_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    /// Create a record with no reading data, at the library root.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            display_name: display_name.into(),
            parent_folder_id: FolderId::root(),
            page_count: None,
            last_opened: None,
            per_page_annotation_counts: Vec::new(),
            bookmark_page_indices: Vec::new(),
            created_at: None,
        }
    }

    /// Page count if it is known and non-zero.
    ///
    /// A zero or missing page count makes the reading signals indeterminate.
    #[must_use]
    pub fn known_page_count(&self) -> Option<u32> {
        self.page_count.filter(|&n| n > 0)
    }
}

/// A folder as read from the external store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    /// Folder identifier.
    pub id: FolderId,
    /// Name shown in the library.
    pub name: String,
    /// Folder holding this folder.
    pub parent: FolderId,
}

/// Result of listing candidate documents.
///
/// Unreadable records are reported alongside the readable ones so a single
/// corrupt document never hides the rest of the library.
#[derive(Debug, Default)]
pub struct CandidateScan {
    /// Candidate documents that were read successfully.
    pub records: Vec<DocumentRecord>,
    /// Per-document read failures.
    pub unreadable: Vec<Error>,
}
