//! Configuration model types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::SourcePatterns;
use crate::state::ReadingStatus;

/// Default location of the device's document store.
pub const DEFAULT_DOCUMENTS_PATH: &str = "/home/root/.local/share/remarkable/xochitl";

/// Names of the managed folders at the library root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folders {
    /// Folder for newly detected articles.
    pub to_read: String,
    /// Folder for articles detected as read.
    pub read: String,
    /// Folder for archived articles.
    pub archive: String,
}

impl Default for Folders {
    fn default() -> Self {
        Self {
            to_read: "To Read".to_string(),
            read: "Read Articles".to_string(),
            archive: "Archived Articles".to_string(),
        }
    }
}

impl Folders {
    /// Folder name that holds documents with the given status.
    #[must_use]
    pub fn name_for(&self, status: ReadingStatus) -> Option<&str> {
        match status {
            ReadingStatus::Unclassified => None,
            ReadingStatus::ToRead => Some(&self.to_read),
            ReadingStatus::Read => Some(&self.read),
            ReadingStatus::Archived => Some(&self.archive),
        }
    }

    /// Status whose managed folder is called `name`.
    #[must_use]
    pub fn status_for(&self, name: &str) -> Option<ReadingStatus> {
        [
            ReadingStatus::ToRead,
            ReadingStatus::Read,
            ReadingStatus::Archived,
        ]
        .into_iter()
        .find(|status| self.name_for(*status) == Some(name))
    }
}

/// Thresholds for detecting that a to-read article has been read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReadingDetection {
    /// Move to-read articles to the read folder when a signal fires.
    pub enable_auto_move: bool,
    /// Fraction of pages that must be covered, in `[0, 1]`.
    pub pages_threshold: f64,
    /// Seconds of accumulated open time.
    pub time_threshold: u64,
    /// Any annotation counts as read.
    pub annotation_indicates_read: bool,
    /// Bookmark position counts towards progress.
    pub bookmark_indicates_progress: bool,
}

impl Default for ReadingDetection {
    fn default() -> Self {
        Self {
            enable_auto_move: true,
            pages_threshold: 0.8,
            time_threshold: 300,
            annotation_indicates_read: true,
            bookmark_indicates_progress: true,
        }
    }
}

/// Archiving of read articles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Archive read articles.
    pub enable: bool,
    /// Days after the read transition.
    pub days_threshold: u32,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            enable: false,
            days_threshold: 30,
        }
    }
}

/// Organizer configuration.
///
/// Every field has a default, so a partial file is completed with defaults
/// and an empty object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Managed folder names.
    pub folders: Folders,
    /// Case-insensitive substrings that mark a document as an article.
    pub source_patterns: Vec<String>,
    /// Seconds between cycles in continuous mode.
    pub poll_interval: u64,
    /// Minutes a new article must exist before it is filed.
    pub file_age_threshold: u64,
    /// Create managed folders that do not exist.
    pub create_folders_if_missing: bool,
    /// File into date-named subfolders.
    pub organize_by_date: bool,
    /// `strftime` pattern for date subfolder names.
    pub date_format: String,
    /// Read detection settings.
    pub reading_detection: ReadingDetection,
    /// Archive settings.
    pub archive_read_articles: ArchiveSettings,
    /// Directory holding the document store.
    pub documents_path: PathBuf,
    /// State file; the caller picks a default location when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    /// Seconds allowed for a single filesystem operation.
    pub io_timeout: u64,
    /// Also treat web-looking names (URLs, "article", "blog") as articles.
    pub detect_web_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folders: Folders::default(),
            source_patterns: vec![
                "read on remarkable".to_string(),
                "chrome extension".to_string(),
                "web article".to_string(),
            ],
            poll_interval: 30,
            file_age_threshold: 5,
            create_folders_if_missing: true,
            organize_by_date: false,
            date_format: "%Y-%m-%d".to_string(),
            reading_detection: ReadingDetection::default(),
            archive_read_articles: ArchiveSettings::default(),
            documents_path: PathBuf::from(DEFAULT_DOCUMENTS_PATH),
            state_file: None,
            io_timeout: 10,
            detect_web_names: false,
        }
    }
}

impl Config {
    /// Pause between cycles.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Minimum age of a new article before it is filed.
    #[must_use]
    pub fn file_age_threshold(&self) -> chrono::Duration {
        i64::try_from(self.file_age_threshold)
            .ok()
            .and_then(chrono::Duration::try_minutes)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Archive delay after the read transition.
    #[must_use]
    pub fn archive_after(&self) -> chrono::Duration {
        chrono::Duration::try_days(i64::from(self.archive_read_articles.days_threshold))
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Limit for a single filesystem operation.
    #[must_use]
    pub const fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout)
    }

    /// Candidate predicate built from the configured patterns.
    #[must_use]
    pub fn source_patterns(&self) -> SourcePatterns {
        SourcePatterns::new(&self.source_patterns).with_web_names(self.detect_web_names)
    }
}
