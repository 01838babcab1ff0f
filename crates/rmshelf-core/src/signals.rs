//! Reading-progress signals.
//!
//! Pure functions of a document record and the previously tracked state.
//! An unknown or zero page count yields zero for every page-based signal,
//! so missing data can never push a document forward.

use chrono::{DateTime, Utc};

use crate::document::DocumentRecord;
use crate::state::{SignalsSnapshot, TrackedState};

/// Longest open session credited by a single observed access.
pub const MAX_SESSION_SECONDS: u64 = 3600;

/// Derive the signals for `record` given the state from earlier cycles.
#[must_use]
pub fn extract(record: &DocumentRecord, prior: Option<&TrackedState>) -> SignalsSnapshot {
    let cumulative_open_seconds = prior.map_or(0, |state| {
        state
            .signals
            .cumulative_open_seconds
            .saturating_add(open_delta(state.last_opened_at, record.last_opened))
    });

    let Some(page_count) = record.known_page_count() else {
        return SignalsSnapshot {
            cumulative_open_seconds,
            ..SignalsSnapshot::default()
        };
    };

    SignalsSnapshot {
        pages_covered_fraction: pages_covered(record, page_count),
        annotation_density: annotation_density(record, page_count),
        cumulative_open_seconds,
        bookmark_progress_fraction: bookmark_progress(record, page_count),
    }
}

/// The last-opened time to remember for the next cycle.
///
/// Never moves backwards, so a clock adjustment on the device cannot credit
/// the same session twice.
#[must_use]
pub fn open_baseline(
    record: &DocumentRecord,
    prior: Option<&TrackedState>,
) -> Option<DateTime<Utc>> {
    record.last_opened.max(prior.and_then(|s| s.last_opened_at))
}

/// Seconds credited for an access seen since the previous cycle.
fn open_delta(previous: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> u64 {
    let (Some(previous), Some(current)) = (previous, current) else {
        return 0;
    };
    u64::try_from((current - previous).num_seconds())
        .unwrap_or(0)
        .min(MAX_SESSION_SECONDS)
}

fn pages_covered(record: &DocumentRecord, page_count: u32) -> f64 {
    let covered = record
        .per_page_annotation_counts
        .iter()
        .take(page_count as usize)
        .filter(|&&count| count > 0)
        .count();
    ratio(covered, page_count)
}

fn annotation_density(record: &DocumentRecord, page_count: u32) -> f64 {
    let total: u64 = record
        .per_page_annotation_counts
        .iter()
        .map(|&count| u64::from(count))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let total = total as f64;
    total / f64::from(page_count)
}

fn bookmark_progress(record: &DocumentRecord, page_count: u32) -> f64 {
    record
        .bookmark_page_indices
        .iter()
        .filter(|&&index| index < page_count)
        .max()
        .map_or(0.0, |&index| f64::from(index + 1) / f64::from(page_count))
}

fn ratio(count: usize, page_count: u32) -> f64 {
    u32::try_from(count).map_or(1.0, |count| f64::from(count) / f64::from(page_count))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::document::DocumentId;
    use chrono::Duration;
    use proptest::prelude::*;

    fn record(pages: Option<u32>, counts: &[u32], bookmarks: &[u32]) -> DocumentRecord {
        let mut record = DocumentRecord::new("doc", "web article");
        record.page_count = pages;
        record.per_page_annotation_counts = counts.to_vec();
        record.bookmark_page_indices = bookmarks.to_vec();
        record
    }

    fn prior(seconds: u64, last_opened: Option<DateTime<Utc>>) -> TrackedState {
        let mut state = TrackedState::new(DocumentId::new("doc"), Utc::now());
        state.signals.cumulative_open_seconds = seconds;
        state.last_opened_at = last_opened;
        state
    }

    #[test]
    fn test_page_signals() {
        let signals = extract(&record(Some(10), &[2, 0, 1, 0, 0, 3], &[6]), None);
        assert_eq!(signals.pages_covered_fraction, 0.3);
        assert_eq!(signals.annotation_density, 0.6);
        assert_eq!(signals.bookmark_progress_fraction, 0.7);
        assert_eq!(signals.cumulative_open_seconds, 0);
    }

    #[test]
    fn test_unknown_page_count_is_zero() {
        for pages in [None, Some(0)] {
            let signals = extract(&record(pages, &[5, 5], &[1]), None);
            assert_eq!(signals.pages_covered_fraction, 0.0);
            assert_eq!(signals.annotation_density, 0.0);
            assert_eq!(signals.bookmark_progress_fraction, 0.0);
        }
    }

    #[test]
    fn test_last_page_bookmark_is_full_progress() {
        let signals = extract(&record(Some(4), &[], &[0, 3]), None);
        assert_eq!(signals.bookmark_progress_fraction, 1.0);

        let signals = extract(&record(Some(4), &[], &[9]), None);
        assert_eq!(signals.bookmark_progress_fraction, 0.0);
    }

    #[test]
    fn test_open_time_accumulates_with_cap() {
        let base = Utc::now();
        let mut doc = record(Some(1), &[], &[]);

        doc.last_opened = Some(base + Duration::seconds(120));
        let signals = extract(&doc, Some(&prior(100, Some(base))));
        assert_eq!(signals.cumulative_open_seconds, 220);

        doc.last_opened = Some(base + Duration::hours(5));
        let signals = extract(&doc, Some(&prior(100, Some(base))));
        assert_eq!(signals.cumulative_open_seconds, 100 + MAX_SESSION_SECONDS);

        // Clock went backwards
        doc.last_opened = Some(base - Duration::seconds(30));
        let signals = extract(&doc, Some(&prior(100, Some(base))));
        assert_eq!(signals.cumulative_open_seconds, 100);
    }

    #[test]
    fn test_first_observation_has_no_open_time() {
        let mut doc = record(Some(1), &[], &[]);
        doc.last_opened = Some(Utc::now());
        assert_eq!(extract(&doc, None).cumulative_open_seconds, 0);
        assert_eq!(open_baseline(&doc, None), doc.last_opened);
    }

    #[test]
    fn test_open_baseline_never_regresses() {
        let base = Utc::now();
        let mut doc = record(Some(1), &[], &[]);
        doc.last_opened = Some(base - Duration::minutes(1));
        assert_eq!(open_baseline(&doc, Some(&prior(0, Some(base)))), Some(base));
        doc.last_opened = None;
        assert_eq!(open_baseline(&doc, Some(&prior(0, Some(base)))), Some(base));
    }

    proptest! {
        #[test]
        fn test_fractions_stay_in_unit_range(
            pages in 0u32..50,
            counts in proptest::collection::vec(0u32..20, 0..80),
            bookmarks in proptest::collection::vec(0u32..100, 0..10),
        ) {
            let doc = record(Some(pages), &counts, &bookmarks);
            let signals = extract(&doc, None);
            prop_assert!((0.0..=1.0).contains(&signals.pages_covered_fraction));
            prop_assert!((0.0..=1.0).contains(&signals.bookmark_progress_fraction));
            prop_assert!(signals.annotation_density >= 0.0);
            prop_assert_eq!(signals, extract(&doc, None));
        }
    }
}
