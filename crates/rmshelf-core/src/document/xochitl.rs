//! Adapter for the tablet's on-disk document store.
//!
//! The reader application keeps every item as a set of sibling files named
//! after the item id:
//!
//! - `<id>.metadata`: name, parent folder, type, timestamps (epoch millis)
//! - `<id>.content`: page list, page count, bookmarks
//! - `<id>/<page>-metadata.json` and `<id>/<page>.rm`: per-page layers
//! - `<id>.highlights/<page>.json`: text highlights
//!
//! Documents are only ever written through [`write_atomic`], and only the
//! `parent` field changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::model::{CandidateScan, DocumentId, DocumentRecord, FolderId, FolderRecord};
use super::patterns::SourcePatterns;
use super::store::DocumentStore;
use crate::fsio::{bounded, read_optional, write_atomic};
use crate::{Error, Result};

const DOCUMENT_TYPE: &str = "DocumentType";
const COLLECTION_TYPE: &str = "CollectionType";

/// Default bound on a single filesystem call.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Document store backed by the reader application's data directory.
#[derive(Debug, Clone)]
pub struct XochitlStore {
    root: PathBuf,
    io_timeout: Duration,
}

impl XochitlStore {
    /// Create a store reading from `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the bound on each filesystem call.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Data directory this store reads.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.metadata"))
    }

    fn content_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.content"))
    }

    /// Ids of every item that has a metadata file, sorted.
    async fn item_ids(&self) -> Result<Vec<String>> {
        let unavailable = |e: Error| Error::StoreUnavailable(format!("{}: {e}", self.root.display()));

        let mut entries = bounded(self.io_timeout, tokio::fs::read_dir(&self.root))
            .await
            .map_err(unavailable)?;

        let mut ids = Vec::new();
        while let Some(entry) = bounded(self.io_timeout, entries.next_entry())
            .await
            .map_err(unavailable)?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "metadata")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn read_metadata(&self, id: &str) -> Result<RawMetadata> {
        let bytes = read_optional(&self.metadata_path(id), self.io_timeout)
            .await?
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn read_json<T>(&self, path: &Path) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        match read_optional(path, self.io_timeout).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Reads everything beyond the metadata file for a candidate document.
    async fn read_record(&self, id: &str, meta: RawMetadata) -> Result<DocumentRecord> {
        let content: RawContent = self
            .read_json(&self.content_path(id))
            .await?
            .unwrap_or_default();

        let page_ids = content.page_ids();
        let page_count = content.page_count.or_else(|| {
            (!page_ids.is_empty()).then(|| u32::try_from(page_ids.len()).unwrap_or(u32::MAX))
        });

        let mut per_page_annotation_counts = Vec::with_capacity(page_ids.len());
        for page_id in &page_ids {
            per_page_annotation_counts.push(self.page_annotations(id, page_id).await?);
        }

        let bookmark_page_indices = content
            .bookmarks
            .iter()
            .filter_map(|bookmark| bookmark.index(&page_ids))
            .collect();

        Ok(DocumentRecord {
            id: DocumentId::new(id),
            display_name: meta.visible_name,
            parent_folder_id: FolderId::new(meta.parent),
            page_count,
            last_opened: meta.last_opened,
            per_page_annotation_counts,
            bookmark_page_indices,
            created_at: meta.created_time.or(meta.last_modified),
        })
    }

    /// Counts strokes and highlights on one page.
    async fn page_annotations(&self, id: &str, page_id: &str) -> Result<u32> {
        let page_dir = self.root.join(id);

        let mut count = 0u32;
        if let Some(meta) = self
            .read_json::<RawPageMetadata>(&page_dir.join(format!("{page_id}-metadata.json")))
            .await?
        {
            count = count.saturating_add(meta.layers.iter().map(RawLayer::annotations).sum());
        }

        let highlights_path = self
            .root
            .join(format!("{id}.highlights"))
            .join(format!("{page_id}.json"));
        if let Some(highlights) = self.read_json::<RawHighlights>(&highlights_path).await? {
            count = count.saturating_add(highlights.count());
        }

        // A stroke file only exists once something was drawn on the page.
        if count == 0
            && bounded(
                self.io_timeout,
                tokio::fs::try_exists(page_dir.join(format!("{page_id}.rm"))),
            )
            .await?
        {
            count = 1;
        }

        Ok(count)
    }
}

impl DocumentStore for XochitlStore {
    async fn list_candidate_documents(&self, patterns: &SourcePatterns) -> Result<CandidateScan> {
        let mut scan = CandidateScan::default();

        for id in self.item_ids().await? {
            let meta = match self.read_metadata(&id).await {
                Ok(meta) => meta,
                Err(e) => {
                    scan.unreadable.push(metadata_error(&id, &e));
                    continue;
                }
            };

            if !meta.is_live(DOCUMENT_TYPE) || !patterns.matches(&meta.visible_name) {
                continue;
            }

            match self.read_record(&id, meta).await {
                Ok(record) => scan.records.push(record),
                Err(e) => scan.unreadable.push(metadata_error(&id, &e)),
            }
        }

        Ok(scan)
    }

    async fn list_folders(&self) -> Result<Vec<FolderRecord>> {
        let mut folders = Vec::new();

        for id in self.item_ids().await? {
            match self.read_metadata(&id).await {
                Ok(meta) if meta.is_live(COLLECTION_TYPE) => folders.push(FolderRecord {
                    id: FolderId::new(id),
                    name: meta.visible_name,
                    parent: FolderId::new(meta.parent),
                }),
                Ok(_) => {}
                Err(e) => warn!(%id, error = %e, "Skipping unreadable item while listing folders"),
            }
        }

        Ok(folders)
    }

    async fn create_folder(&self, name: &str, parent: &FolderId) -> Result<FolderId> {
        let id = uuid::Uuid::new_v4().to_string();
        let metadata = serde_json::json!({
            "deleted": false,
            "lastModified": Utc::now().timestamp_millis().to_string(),
            "metadatamodified": true,
            "modified": true,
            "parent": parent.as_str(),
            "pinned": false,
            "synced": false,
            "type": COLLECTION_TYPE,
            "version": 1,
            "visibleName": name,
        });

        // Metadata last: the folder only becomes visible once it is complete.
        write_atomic(&self.content_path(&id), b"{}".to_vec(), self.io_timeout).await?;
        write_atomic(
            &self.metadata_path(&id),
            serde_json::to_vec_pretty(&metadata)?,
            self.io_timeout,
        )
        .await?;

        info!(folder = %name, %id, %parent, "Created folder");
        Ok(FolderId::new(id))
    }

    async fn move_document(&self, id: &DocumentId, destination: &FolderId) -> Result<()> {
        let move_error = |reason: String| Error::Move {
            id: id.clone(),
            reason,
        };

        let path = self.metadata_path(id.as_str());
        let bytes = read_optional(&path, self.io_timeout)
            .await?
            .ok_or_else(|| move_error("metadata record not found".to_string()))?;

        let mut value: Value = serde_json::from_slice(&bytes)?;
        let Some(fields) = value.as_object_mut() else {
            return Err(move_error("metadata record is not a JSON object".to_string()));
        };

        if fields.get("parent").and_then(Value::as_str) == Some(destination.as_str()) {
            debug!(%id, %destination, "Document already in destination");
            return Ok(());
        }

        fields.insert(
            "parent".to_string(),
            Value::String(destination.as_str().to_string()),
        );
        write_atomic(&path, serde_json::to_vec_pretty(&value)?, self.io_timeout).await
    }
}

fn metadata_error(id: &str, error: &Error) -> Error {
    Error::MetadataRead {
        id: DocumentId::new(id),
        reason: error.to_string(),
    }
}

/// The fields of `<id>.metadata` the organizer reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    visible_name: String,
    #[serde(default)]
    parent: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default, deserialize_with = "epoch_millis")]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "epoch_millis")]
    last_opened: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "epoch_millis")]
    created_time: Option<DateTime<Utc>>,
}

impl RawMetadata {
    fn is_live(&self, kind: &str) -> bool {
        self.kind == kind && !self.deleted && self.parent != FolderId::TRASH
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    page_count: Option<u32>,
    #[serde(default)]
    pages: Vec<String>,
    c_pages: Option<RawPageList>,
    #[serde(default)]
    bookmarks: Vec<BookmarkRef>,
}

impl RawContent {
    /// Page ids in reading order; newer firmware nests them under `cPages`.
    fn page_ids(&self) -> Vec<String> {
        if !self.pages.is_empty() {
            return self.pages.clone();
        }
        self.c_pages
            .as_ref()
            .map(|list| list.pages.iter().map(|p| p.id.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct RawPageList {
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookmarkRef {
    Index(u32),
    PageId(String),
}

impl BookmarkRef {
    fn index(&self, page_ids: &[String]) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            Self::PageId(page) => page_ids
                .iter()
                .position(|p| p == page)
                .and_then(|i| u32::try_from(i).ok()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawPageMetadata {
    #[serde(default)]
    layers: Vec<RawLayer>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLayer {
    #[serde(default)]
    strokes: Value,
    #[serde(default)]
    highlights: Value,
}

impl RawLayer {
    fn annotations(&self) -> u32 {
        count_marks(&self.strokes).saturating_add(count_marks(&self.highlights))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawHighlights {
    #[serde(default)]
    highlights: Vec<Value>,
}

impl RawHighlights {
    fn count(&self) -> u32 {
        self.highlights.iter().map(count_marks).sum()
    }
}

/// Interprets a loosely-typed annotation field as a mark count.
fn count_marks(value: &Value) -> u32 {
    match value {
        Value::Null | Value::Bool(false) => 0,
        Value::Array(items) => u32::try_from(items.len()).unwrap_or(u32::MAX),
        Value::Number(n) => n
            .as_u64()
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX)),
        Value::String(s) if s.is_empty() => 0,
        Value::Object(map) if map.is_empty() => 0,
        _ => 1,
    }
}

/// Epoch milliseconds, written by the device as a string or a number.
fn epoch_millis<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(i64),
        Text(String),
    }

    let millis = match Option::<Millis>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Millis::Number(n)) => n,
        Some(Millis::Text(s)) if s.trim().is_empty() => return Ok(None),
        Some(Millis::Text(s)) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };

    Ok((millis > 0)
        .then(|| DateTime::from_timestamp_millis(millis))
        .flatten())
}
