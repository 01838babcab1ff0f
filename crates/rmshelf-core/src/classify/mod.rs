//! Reading-status classification.
//!
//! Classification is a deterministic walk over an explicit, ordered list of
//! [`Rule`]s. The first rule whose source status matches and whose
//! condition holds decides the document's next status; at most one rule
//! fires per document per cycle.

mod rules;

pub use rules::{ClassifierInput, Rule};

use crate::config::Config;
use crate::state::ReadingStatus;

/// Rule name recorded when a first-seen document is seeded from the managed
/// folder it already sits in.
pub const ADOPTED_RULE: &str = "adopted";

/// Outcome of classifying one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Status the document should move to.
    pub to: ReadingStatus,
    /// Rule that fired.
    pub rule: Rule,
}

/// Decide whether a document should advance.
///
/// Returns `None` when no rule fires, meaning the status stays as it is.
#[must_use]
pub fn classify(input: &ClassifierInput<'_>, config: &Config) -> Option<Decision> {
    Rule::ALL
        .into_iter()
        .find(|rule| rule.matches(input, config))
        .map(|rule| Decision { to: rule.to(), rule })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::{DocumentId, DocumentRecord};
    use crate::state::TrackedState;
    use chrono::{DateTime, Duration, Utc};

    fn state_with(status: ReadingStatus, entered: DateTime<Utc>) -> TrackedState {
        let mut state = TrackedState::new(DocumentId::new("doc"), entered);
        for next in [ReadingStatus::ToRead, ReadingStatus::Read, ReadingStatus::Archived] {
            if next <= status {
                state.advance(next, entered, "test").unwrap();
            }
        }
        state
    }

    fn decide(record: &DocumentRecord, state: &TrackedState, config: &Config) -> Option<Decision> {
        let patterns = config.source_patterns();
        let input = ClassifierInput {
            record,
            state,
            patterns: &patterns,
            now: Utc::now(),
        };
        classify(&input, config)
    }

    fn paged(pages: u32) -> DocumentRecord {
        let mut record = DocumentRecord::new("doc", "Article (read on remarkable)");
        record.page_count = Some(pages);
        record
    }

    #[test]
    fn test_new_article_old_enough_goes_to_read_folder() {
        let now = Utc::now();
        let mut record = DocumentRecord::new("doc", "Article (read on remarkable)");
        record.created_at = Some(now - Duration::minutes(10));
        let state = TrackedState::new(record.id.clone(), now);

        let decision = decide(&record, &state, &Config::default()).unwrap();
        assert_eq!(decision.to, ReadingStatus::ToRead);
        assert_eq!(decision.rule, Rule::FileAge);
    }

    #[test]
    fn test_new_article_too_young_or_undated_waits() {
        let now = Utc::now();
        let mut record = DocumentRecord::new("doc", "Article (read on remarkable)");
        let state = TrackedState::new(record.id.clone(), now);

        record.created_at = Some(now - Duration::minutes(2));
        assert_eq!(decide(&record, &state, &Config::default()), None);

        record.created_at = None;
        assert_eq!(decide(&record, &state, &Config::default()), None);
    }

    #[test]
    fn test_non_matching_name_is_never_filed() {
        let now = Utc::now();
        let mut record = DocumentRecord::new("doc", "Quarterly notes");
        record.created_at = Some(now - Duration::days(1));
        let state = TrackedState::new(record.id.clone(), now);

        assert_eq!(decide(&record, &state, &Config::default()), None);
    }

    #[test]
    fn test_file_age_uses_supplied_patterns() {
        let now = Utc::now();
        let mut record = DocumentRecord::new("doc", "Field notes");
        record.created_at = Some(now - Duration::days(1));
        let state = TrackedState::new(record.id.clone(), now);
        let config = Config::default();
        let patterns = crate::document::SourcePatterns::new(["field notes"]);

        let input = ClassifierInput {
            record: &record,
            state: &state,
            patterns: &patterns,
            now,
        };
        assert_eq!(classify(&input, &config).map(|d| d.rule), Some(Rule::FileAge));
    }

    #[test]
    fn test_pages_threshold_is_inclusive() {
        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        let mut config = Config::default();
        config.reading_detection.annotation_indicates_read = false;

        state.signals.pages_covered_fraction = 0.85;
        config.reading_detection.pages_threshold = 0.8;
        let decision = decide(&paged(20), &state, &config).unwrap();
        assert_eq!(decision.to, ReadingStatus::Read);
        assert_eq!(decision.rule, Rule::PagesCovered);

        config.reading_detection.pages_threshold = 0.9;
        assert_eq!(decide(&paged(20), &state, &config), None);

        state.signals.pages_covered_fraction = 0.9;
        assert_eq!(
            decide(&paged(20), &state, &config).map(|d| d.rule),
            Some(Rule::PagesCovered)
        );
    }

    #[test]
    fn test_each_read_signal_suffices_alone() {
        let config = Config::default();

        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.cumulative_open_seconds = 300;
        assert_eq!(decide(&paged(5), &state, &config).map(|d| d.rule), Some(Rule::OpenTime));

        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.annotation_density = 0.2;
        assert_eq!(
            decide(&paged(5), &state, &config).map(|d| d.rule),
            Some(Rule::Annotations)
        );

        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.bookmark_progress_fraction = 0.8;
        assert_eq!(
            decide(&paged(5), &state, &config).map(|d| d.rule),
            Some(Rule::BookmarkProgress)
        );
    }

    #[test]
    fn test_first_matching_rule_is_recorded() {
        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.pages_covered_fraction = 1.0;
        state.signals.cumulative_open_seconds = 10_000;
        state.signals.annotation_density = 3.0;

        let decision = decide(&paged(5), &state, &Config::default()).unwrap();
        assert_eq!(decision.rule, Rule::PagesCovered);
    }

    #[test]
    fn test_signal_switches_disable_rules() {
        let mut config = Config::default();
        config.reading_detection.annotation_indicates_read = false;
        config.reading_detection.bookmark_indicates_progress = false;

        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.annotation_density = 2.0;
        state.signals.bookmark_progress_fraction = 1.0;
        assert_eq!(decide(&paged(5), &state, &config), None);

        config.reading_detection = crate::config::ReadingDetection {
            enable_auto_move: false,
            ..Default::default()
        };
        state.signals.pages_covered_fraction = 1.0;
        assert_eq!(decide(&paged(5), &state, &config), None);
    }

    #[test]
    fn test_unknown_page_count_blocks_read() {
        let mut state = state_with(ReadingStatus::ToRead, Utc::now());
        state.signals.cumulative_open_seconds = 10_000;

        let mut record = paged(0);
        assert_eq!(decide(&record, &state, &Config::default()), None);
        record.page_count = None;
        assert_eq!(decide(&record, &state, &Config::default()), None);
    }

    #[test]
    fn test_archive_after_threshold() {
        let mut config = Config::default();
        let state = state_with(ReadingStatus::Read, Utc::now() - Duration::days(31));

        assert_eq!(decide(&paged(3), &state, &config), None);

        config.archive_read_articles.enable = true;
        config.archive_read_articles.days_threshold = 30;
        let decision = decide(&paged(3), &state, &config).unwrap();
        assert_eq!(decision.to, ReadingStatus::Archived);
        assert_eq!(decision.rule, Rule::ArchiveAge);

        let recent = state_with(ReadingStatus::Read, Utc::now() - Duration::days(29));
        assert_eq!(decide(&paged(3), &recent, &config), None);
    }

    #[test]
    fn test_archived_is_terminal() {
        let mut config = Config::default();
        config.archive_read_articles.enable = true;
        let mut state = state_with(ReadingStatus::Archived, Utc::now() - Duration::days(400));
        state.signals.pages_covered_fraction = 1.0;

        assert_eq!(decide(&paged(3), &state, &config), None);
    }
}
