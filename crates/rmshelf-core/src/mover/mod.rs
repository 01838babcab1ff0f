//! Folder resolution and document moves.
//!
//! The [`Mover`] turns a status into a destination folder, creating the
//! managed folder and its date bucket when allowed, and asks the store to
//! move the document there. The folder tree is read once per cycle and
//! kept in a [`FolderMap`].

mod folder_map;

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use tracing::debug;

pub use folder_map::FolderMap;

use crate::config::Config;
use crate::document::{DocumentRecord, DocumentStore, FolderId, FolderRecord};
use crate::state::ReadingStatus;
use crate::{Error, Result};

/// Name of the date bucket for `date`, or `None` if `date_format` is not a
/// usable `strftime` pattern.
#[must_use]
pub fn bucket_name(date_format: &str, date: DateTime<Utc>) -> Option<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(date_format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut name = String::new();
    write!(name, "{}", date.format_with_items(items.iter())).ok()?;
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Where [`Mover::apply`] left a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Folder the document now sits in.
    pub destination: FolderId,
    /// False if the document was already there and nothing was written.
    pub moved: bool,
}

/// Applies status transitions as folder moves.
#[derive(Debug, Default)]
pub struct Mover {
    folder_map: Option<FolderMap>,
}

impl Mover {
    /// Create a mover with no folder tree loaded.
    #[must_use]
    pub const fn new() -> Self {
        Self { folder_map: None }
    }

    /// Forget the folder tree so the next use reloads it.
    pub fn begin_cycle(&mut self) {
        self.folder_map = None;
    }

    async fn folder_map<S: DocumentStore>(&mut self, store: &S) -> Result<&mut FolderMap> {
        if self.folder_map.is_none() {
            let folders = store.list_folders().await?;
            debug!(folders = folders.len(), "Loaded folder tree");
            self.folder_map = Some(FolderMap::new(folders));
        }
        Ok(self.folder_map.get_or_insert_with(FolderMap::default))
    }

    /// Status implied by where the document currently sits, if it is in
    /// one of the managed folders or their date buckets.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder tree cannot be listed.
    pub async fn placement_status<S: DocumentStore>(
        &mut self,
        store: &S,
        record: &DocumentRecord,
        config: &Config,
    ) -> Result<Option<ReadingStatus>> {
        let map = self.folder_map(store).await?;
        Ok(map.status_of(&record.parent_folder_id, &config.folders))
    }

    /// Resolve the folder a document with `status` belongs in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Move`] if the status has no folder or a folder is
    /// missing and may not be created. Store failures are passed through.
    pub async fn resolve_destination<S: DocumentStore>(
        &mut self,
        store: &S,
        record: &DocumentRecord,
        status: ReadingStatus,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Result<FolderId> {
        let move_error = |reason: String| Error::Move {
            id: record.id.clone(),
            reason,
        };

        let name = config
            .folders
            .name_for(status)
            .ok_or_else(|| move_error(format!("no folder is configured for status {status}")))?;
        let mut destination = self
            .ensure_folder(store, name, &FolderId::root(), config)
            .await?
            .ok_or_else(|| {
                move_error(format!(
                    "folder '{name}' does not exist and folder creation is disabled"
                ))
            })?;

        if config.organize_by_date {
            let date = record.created_at.unwrap_or(now);
            let bucket = bucket_name(&config.date_format, date).ok_or_else(|| {
                move_error(format!("date format '{}' is unusable", config.date_format))
            })?;
            destination = self
                .ensure_folder(store, &bucket, &destination, config)
                .await?
                .ok_or_else(|| {
                    move_error(format!(
                        "folder '{name}/{bucket}' does not exist and folder creation is disabled"
                    ))
                })?;
        }

        Ok(destination)
    }

    async fn ensure_folder<S: DocumentStore>(
        &mut self,
        store: &S,
        name: &str,
        parent: &FolderId,
        config: &Config,
    ) -> Result<Option<FolderId>> {
        let map = self.folder_map(store).await?;
        if let Some(id) = map.find(name, parent) {
            return Ok(Some(id.clone()));
        }
        if !config.create_folders_if_missing {
            return Ok(None);
        }

        let id = store.create_folder(name, parent).await?;
        debug!(folder = %name, %id, %parent, "Added folder to map");
        map.insert(FolderRecord {
            id: id.clone(),
            name: name.to_string(),
            parent: parent.clone(),
        });
        Ok(Some(id))
    }

    /// Move a document into the folder for `status`.
    ///
    /// A document already in its destination is left untouched, which the
    /// returned [`Placement`] reports.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Move`] for anything that stops this document from
    /// moving, and [`Error::StoreUnavailable`] if the store cannot be
    /// reached at all.
    pub async fn apply<S: DocumentStore>(
        &mut self,
        store: &S,
        record: &DocumentRecord,
        status: ReadingStatus,
        config: &Config,
        now: DateTime<Utc>,
    ) -> Result<Placement> {
        let result = async {
            let destination = self
                .resolve_destination(store, record, status, config, now)
                .await?;
            let moved = record.parent_folder_id != destination;
            if moved {
                store.move_document(&record.id, &destination).await?;
            }
            Ok(Placement { destination, moved })
        }
        .await;

        result.map_err(|e| match e {
            Error::Move { .. } | Error::StoreUnavailable(_) => e,
            other => Error::Move {
                id: record.id.clone(),
                reason: other.to_string(),
            },
        })
    }
}
