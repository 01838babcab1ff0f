//! Logical folder names resolved to store folder ids.

use crate::config::Folders;
use crate::document::{FolderId, FolderRecord};
use crate::state::ReadingStatus;

/// Snapshot of the store's folder tree, extended as folders are created.
#[derive(Debug, Clone, Default)]
pub struct FolderMap {
    folders: Vec<FolderRecord>,
}

impl FolderMap {
    /// Build from a folder listing.
    ///
    /// Folders are ordered by id so that duplicate names always resolve to
    /// the same folder.
    #[must_use]
    pub fn new(mut folders: Vec<FolderRecord>) -> Self {
        folders.sort_by(|a, b| a.id.cmp(&b.id));
        Self { folders }
    }

    /// Find the folder called `name` directly inside `parent`.
    #[must_use]
    pub fn find(&self, name: &str, parent: &FolderId) -> Option<&FolderId> {
        self.folders
            .iter()
            .find(|f| f.name == name && &f.parent == parent)
            .map(|f| &f.id)
    }

    /// Record a newly created folder.
    pub fn insert(&mut self, folder: FolderRecord) {
        let at = self.folders.partition_point(|f| f.id < folder.id);
        self.folders.insert(at, folder);
    }

    /// Status implied by a document sitting in `folder`.
    ///
    /// A managed folder at the library root, or any folder directly inside
    /// one (a date bucket), maps to the managed folder's status.
    #[must_use]
    pub fn status_of(&self, folder: &FolderId, names: &Folders) -> Option<ReadingStatus> {
        if folder.is_root() || folder.is_trash() {
            return None;
        }
        let record = self.folders.iter().find(|f| &f.id == folder)?;
        self.managed_status(record, names).or_else(|| {
            let parent = self.folders.iter().find(|f| f.id == record.parent)?;
            self.managed_status(parent, names)
        })
    }

    fn managed_status(&self, folder: &FolderRecord, names: &Folders) -> Option<ReadingStatus> {
        let status = names.status_for(&folder.name)?;
        // Only the first root-level folder with the name is managed.
        (folder.parent.is_root() && self.find(&folder.name, &folder.parent) == Some(&folder.id))
            .then_some(status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn folder(id: &str, name: &str, parent: &str) -> FolderRecord {
        FolderRecord {
            id: FolderId::new(id),
            name: name.to_string(),
            parent: FolderId::new(parent),
        }
    }

    #[test]
    fn test_find_respects_parent() {
        let map = FolderMap::new(vec![
            folder("a", "To Read", ""),
            folder("b", "2024-01-01", "a"),
            folder("c", "2024-01-01", ""),
        ]);

        assert_eq!(map.find("To Read", &FolderId::root()), Some(&FolderId::new("a")));
        assert_eq!(
            map.find("2024-01-01", &FolderId::new("a")),
            Some(&FolderId::new("b"))
        );
        assert_eq!(map.find("To Read", &FolderId::new("a")), None);
    }

    #[test]
    fn test_duplicate_names_resolve_to_lowest_id() {
        let mut map = FolderMap::new(vec![folder("z", "Read Articles", "")]);
        map.insert(folder("m", "Read Articles", ""));

        assert_eq!(map.find("Read Articles", &FolderId::root()), Some(&FolderId::new("m")));
        assert_eq!(map.status_of(&FolderId::new("z"), &Folders::default()), None);
    }

    #[test]
    fn test_status_of_managed_folders_and_buckets() {
        let names = Folders::default();
        let map = FolderMap::new(vec![
            folder("r", "Read Articles", ""),
            folder("r-day", "2024-03-01", "r"),
            folder("nested", "Read Articles", "other"),
            folder("other", "Projects", ""),
            folder("deep", "x", "r-day"),
        ]);

        assert_eq!(map.status_of(&FolderId::new("r"), &names), Some(ReadingStatus::Read));
        assert_eq!(map.status_of(&FolderId::new("r-day"), &names), Some(ReadingStatus::Read));
        assert_eq!(map.status_of(&FolderId::new("nested"), &names), None);
        assert_eq!(map.status_of(&FolderId::new("other"), &names), None);
        assert_eq!(map.status_of(&FolderId::new("deep"), &names), None);
        assert_eq!(map.status_of(&FolderId::root(), &names), None);
        assert_eq!(map.status_of(&FolderId::new("missing"), &names), None);
    }
}
