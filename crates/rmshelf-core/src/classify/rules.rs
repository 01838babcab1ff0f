//! The ordered classification rules.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::document::{DocumentRecord, SourcePatterns};
use crate::state::{ReadingStatus, TrackedState};

/// Everything a rule may look at for one document.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    /// The document as the store reports it now.
    pub record: &'a DocumentRecord,
    /// Tracked state, with this cycle's signals already applied.
    pub state: &'a TrackedState,
    /// Candidate predicate built from the configuration.
    pub patterns: &'a SourcePatterns,
    /// Time of the cycle.
    pub now: DateTime<Utc>,
}

/// A single status transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// A new article has existed long enough to be filed.
    FileAge,
    /// Enough pages carry annotations.
    PagesCovered,
    /// The document was open long enough.
    OpenTime,
    /// The document has any annotation.
    Annotations,
    /// A bookmark sits far enough into the document.
    BookmarkProgress,
    /// The document was read long enough ago.
    ArchiveAge,
}

impl Rule {
    /// All rules in evaluation order.
    pub const ALL: [Self; 6] = [
        Self::FileAge,
        Self::PagesCovered,
        Self::OpenTime,
        Self::Annotations,
        Self::BookmarkProgress,
        Self::ArchiveAge,
    ];

    /// Status the rule applies to.
    #[must_use]
    pub const fn from(&self) -> ReadingStatus {
        match self {
            Self::FileAge => ReadingStatus::Unclassified,
            Self::PagesCovered | Self::OpenTime | Self::Annotations | Self::BookmarkProgress => {
                ReadingStatus::ToRead
            }
            Self::ArchiveAge => ReadingStatus::Read,
        }
    }

    /// Status the rule moves to.
    #[must_use]
    pub const fn to(&self) -> ReadingStatus {
        match self {
            Self::FileAge => ReadingStatus::ToRead,
            Self::PagesCovered | Self::OpenTime | Self::Annotations | Self::BookmarkProgress => {
                ReadingStatus::Read
            }
            Self::ArchiveAge => ReadingStatus::Archived,
        }
    }

    /// Name recorded in the transition history.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FileAge => "file_age",
            Self::PagesCovered => "pages_covered",
            Self::OpenTime => "open_time",
            Self::Annotations => "annotations",
            Self::BookmarkProgress => "bookmark_progress",
            Self::ArchiveAge => "archive_age",
        }
    }

    /// Returns true if the rule fires for `input`.
    #[must_use]
    pub fn matches(&self, input: &ClassifierInput<'_>, config: &Config) -> bool {
        if input.state.current_status != self.from() {
            return false;
        }

        let detection = &config.reading_detection;
        let signals = &input.state.signals;
        match self {
            Self::FileAge => {
                input.patterns.matches(&input.record.display_name)
                    && input
                        .record
                        .created_at
                        .is_some_and(|created| input.now - created >= config.file_age_threshold())
            }
            Self::PagesCovered => {
                read_detection_applies(input, config)
                    && signals.pages_covered_fraction >= detection.pages_threshold
            }
            Self::OpenTime => {
                read_detection_applies(input, config)
                    && signals.cumulative_open_seconds >= detection.time_threshold
            }
            Self::Annotations => {
                read_detection_applies(input, config)
                    && detection.annotation_indicates_read
                    && signals.annotation_density > 0.0
            }
            Self::BookmarkProgress => {
                read_detection_applies(input, config)
                    && detection.bookmark_indicates_progress
                    && signals.bookmark_progress_fraction >= detection.pages_threshold
            }
            Self::ArchiveAge => {
                config.archive_read_articles.enable
                    && input
                        .state
                        .entered_at(ReadingStatus::Read)
                        .is_some_and(|read_at| input.now - read_at >= config.archive_after())
            }
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read detection is on and the page count is known.
fn read_detection_applies(input: &ClassifierInput<'_>, config: &Config) -> bool {
    config.reading_detection.enable_auto_move && input.record.known_page_count().is_some()
}
