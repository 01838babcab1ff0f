//! Tracked state data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::{Error, Result};

/// Reading status of a tracked document.
///
/// Statuses are ordered; a document only ever moves forward through
/// `Unclassified → ToRead → Read → Archived`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// Seen but not yet filed.
    #[default]
    Unclassified,
    /// Filed in the to-read folder.
    ToRead,
    /// Detected as read and filed in the read folder.
    Read,
    /// Read long enough ago to be archived.
    Archived,
}

impl ReadingStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Unclassified, Self::ToRead, Self::Read, Self::Archived];

    /// Parse from the persisted string representation.
    ///
    /// Unknown strings are rejected rather than mapped to a default, so a
    /// damaged record can never silently lose a Read or Archived status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unclassified" => Some(Self::Unclassified),
            "to_read" | "toread" => Some(Self::ToRead),
            "read" => Some(Self::Read),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Convert to the persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::ToRead => "to_read",
            Self::Read => "read",
            Self::Archived => "archived",
        }
    }

    /// Returns true if moving to `to` would advance the document.
    #[must_use]
    pub fn can_advance_to(self, to: Self) -> bool {
        to > self
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reading-progress signals captured at the last classification.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalsSnapshot {
    /// Distinct annotated pages over page count.
    pub pages_covered_fraction: f64,
    /// Total annotations over page count.
    pub annotation_density: f64,
    /// Accumulated time the document was open.
    pub cumulative_open_seconds: u64,
    /// Furthest bookmarked page position over page count.
    pub bookmark_progress_fraction: f64,
}

/// One entry of a document's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Status entered.
    pub status: ReadingStatus,
    /// When it was entered.
    pub at: DateTime<Utc>,
    /// Name of the rule that fired.
    #[serde(default)]
    pub rule: String,
}

/// Everything the organizer remembers about one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedState {
    /// Document this state belongs to.
    pub document_id: DocumentId,
    /// First cycle that observed the document.
    pub first_seen_at: DateTime<Utc>,
    /// Last time the classification inputs or the status changed.
    pub last_classified_at: DateTime<Utc>,
    /// Authoritative reading status.
    pub current_status: ReadingStatus,
    /// Signals from the last classification.
    #[serde(default)]
    pub signals: SignalsSnapshot,
    /// Last-opened time seen on the previous cycle, the baseline for
    /// accumulating open time.
    #[serde(default)]
    pub last_opened_at: Option<DateTime<Utc>>,
    /// Ordered status changes.
    #[serde(default)]
    pub transition_history: Vec<Transition>,
}

impl TrackedState {
    /// Create the state for a document observed for the first time.
    #[must_use]
    pub fn new(document_id: DocumentId, now: DateTime<Utc>) -> Self {
        Self {
            document_id,
            first_seen_at: now,
            last_classified_at: now,
            current_status: ReadingStatus::Unclassified,
            signals: SignalsSnapshot::default(),
            last_opened_at: None,
            transition_history: Vec::new(),
        }
    }

    /// Move to a later status and record it in the history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if `to` is not after the
    /// current status.
    pub fn advance(&mut self, to: ReadingStatus, at: DateTime<Utc>, rule: &str) -> Result<()> {
        if !self.current_status.can_advance_to(to) {
            return Err(Error::InvalidTransition {
                from: self.current_status,
                to,
            });
        }
        self.current_status = to;
        self.last_classified_at = at;
        self.transition_history.push(Transition {
            status: to,
            at,
            rule: rule.to_string(),
        });
        Ok(())
    }

    /// When the document most recently entered `status`.
    #[must_use]
    pub fn entered_at(&self, status: ReadingStatus) -> Option<DateTime<Utc>> {
        self.transition_history
            .iter()
            .rev()
            .find(|t| t.status == status)
            .map(|t| t.at)
    }
}
