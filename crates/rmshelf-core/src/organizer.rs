//! The poll loop.
//!
//! An [`Organizer`] owns everything a cycle needs: the configuration, the
//! document store, the tracked state and the mover. Each cycle lists the
//! candidate documents, derives their signals, classifies them and applies
//! at most one transition per document. Cycles never overlap.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::Result;
use crate::classify::{ADOPTED_RULE, ClassifierInput, classify};
use crate::config::Config;
use crate::document::{DocumentRecord, DocumentStore, SourcePatterns};
use crate::mover::Mover;
use crate::signals;
use crate::state::{ReadingStatus, StateRepository, TrackedState};

/// What one cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidate documents read successfully.
    pub candidates: usize,
    /// Documents whose records could not be read.
    pub unreadable: usize,
    /// Documents tracked for the first time.
    pub newly_tracked: usize,
    /// First-seen documents whose status was taken from their folder.
    pub adopted: usize,
    /// Documents moved to the to-read folder.
    pub to_read: usize,
    /// Documents moved to the read folder.
    pub read: usize,
    /// Documents moved to the archive folder.
    pub archived: usize,
    /// Transitions recorded without a write because the document already
    /// sat in its destination.
    pub already_in_place: usize,
    /// Transitions aborted because the move failed.
    pub failed_moves: usize,
}

impl CycleReport {
    /// Total number of documents moved.
    #[must_use]
    pub const fn moved(&self) -> usize {
        self.to_read + self.read + self.archived
    }

    fn count_move(&mut self, status: ReadingStatus) {
        match status {
            ReadingStatus::ToRead => self.to_read += 1,
            ReadingStatus::Read => self.read += 1,
            ReadingStatus::Archived => self.archived += 1,
            ReadingStatus::Unclassified => {}
        }
    }
}

/// Drives scan, classify and move cycles over a document store.
#[derive(Debug)]
pub struct Organizer<S> {
    config: Config,
    patterns: SourcePatterns,
    store: S,
    states: StateRepository,
    mover: Mover,
}

impl<S: DocumentStore> Organizer<S> {
    /// Create an organizer.
    #[must_use]
    pub fn new(config: Config, store: S, states: StateRepository) -> Self {
        Self {
            patterns: config.source_patterns(),
            config,
            store,
            states,
            mover: Mover::new(),
        }
    }

    /// The document store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The tracked state.
    #[must_use]
    pub const fn states(&self) -> &StateRepository {
        &self.states
    }

    /// Run a single cycle now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or the state cannot
    /// be written. Problems with individual documents are only counted in
    /// the report.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run a single cycle as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`Organizer::run_once`].
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        self.mover.begin_cycle();

        let scan = self.store.list_candidate_documents(&self.patterns).await?;
        report.candidates = scan.records.len();
        report.unreadable = scan.unreadable.len();
        for error in &scan.unreadable {
            warn!(%error, "Skipping unreadable document");
        }

        let mut records = scan.records;
        records.sort_by(|a, b| a.id.cmp(&b.id));
        for record in &records {
            self.process(record, now, &mut report).await?;
        }

        self.states.persist().await?;

        if report.moved() > 0 || report.failed_moves > 0 {
            info!(
                to_read = report.to_read,
                read = report.read,
                archived = report.archived,
                failed = report.failed_moves,
                "Processed {} articles",
                report.moved()
            );
        } else {
            debug!(
                candidates = report.candidates,
                unreadable = report.unreadable,
                "Cycle finished with nothing to move"
            );
        }
        Ok(report)
    }

    async fn process(
        &mut self,
        record: &DocumentRecord,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<()> {
        let prior = self.states.get(&record.id).cloned();
        let Some(mut state) = prior.clone() else {
            let state = self.first_seen(record, now, report).await?;
            if state.current_status != ReadingStatus::Unclassified {
                // Adopted: already filed, nothing to move this cycle.
                self.states.upsert(state);
                return Ok(());
            }
            return self.classify_and_move(record, state, None, now, report).await;
        };

        let signals = signals::extract(record, Some(&state));
        let baseline = signals::open_baseline(record, Some(&state));
        if state.signals != signals || state.last_opened_at != baseline {
            state.signals = signals;
            state.last_opened_at = baseline;
            state.last_classified_at = now;
        }

        self.classify_and_move(record, state, prior.as_ref(), now, report)
            .await
    }

    async fn first_seen(
        &mut self,
        record: &DocumentRecord,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<TrackedState> {
        report.newly_tracked += 1;
        let mut state = TrackedState::new(record.id.clone(), now);
        state.signals = signals::extract(record, None);
        state.last_opened_at = signals::open_baseline(record, None);

        if self.states.is_quarantined(&record.id) {
            debug!(id = %record.id, "Re-classifying document with quarantined state");
        }

        if let Some(status) = self
            .mover
            .placement_status(&self.store, record, &self.config)
            .await?
        {
            state.advance(status, now, ADOPTED_RULE)?;
            report.adopted += 1;
            info!(
                id = %record.id,
                name = %record.display_name,
                %status,
                "Adopted document already filed"
            );
        }
        Ok(state)
    }

    async fn classify_and_move(
        &mut self,
        record: &DocumentRecord,
        mut state: TrackedState,
        prior: Option<&TrackedState>,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<()> {
        let input = ClassifierInput {
            record,
            state: &state,
            patterns: &self.patterns,
            now,
        };
        let Some(decision) = classify(&input, &self.config) else {
            self.states.upsert(state);
            return Ok(());
        };

        let from = state.current_status;
        match self
            .mover
            .apply(&self.store, record, decision.to, &self.config, now)
            .await
        {
            Ok(placement) => {
                state.advance(decision.to, now, decision.rule.name())?;
                if placement.moved {
                    report.count_move(decision.to);
                    info!(
                        id = %record.id,
                        name = %record.display_name,
                        %from,
                        to = %decision.to,
                        rule = %decision.rule,
                        destination = %placement.destination,
                        "Moved document"
                    );
                } else {
                    report.already_in_place += 1;
                    info!(
                        id = %record.id,
                        name = %record.display_name,
                        %from,
                        to = %decision.to,
                        rule = %decision.rule,
                        "Document already in place"
                    );
                }
                self.states.upsert(state);
                self.states.persist().await
            }
            Err(error) if error.is_per_document() => {
                report.failed_moves += 1;
                warn!(
                    id = %record.id,
                    %from,
                    to = %decision.to,
                    %error,
                    "Move failed; will retry next cycle"
                );
                // Keep what was known before this cycle; only a brand new
                // document gets its first state recorded.
                if prior.is_none() {
                    self.states.upsert(state);
                }
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// Shutdown is only observed between cycles, so a cycle that has
    /// started always finishes.
    ///
    /// # Errors
    ///
    /// Returns the first fatal cycle error.
    pub async fn run_continuous(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            interval_secs = self.config.poll_interval,
            "Starting continuous organizing"
        );

        while !*shutdown.borrow_and_update() {
            self.run_once().await?;

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Stopped continuous organizing");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::{DocumentId, FolderId, MemoryStore};
    use chrono::Duration;

    fn article(store: &MemoryStore, id: &str, age: Duration, now: DateTime<Utc>) -> DocumentId {
        let mut record = DocumentRecord::new(id, format!("Article {id} (read on remarkable)"));
        record.created_at = Some(now - age);
        record.page_count = Some(10);
        store.insert_document(record);
        DocumentId::new(id)
    }

    fn organizer(store: MemoryStore) -> Organizer<MemoryStore> {
        Organizer::new(Config::default(), store, StateRepository::in_memory())
    }

    #[tokio::test]
    async fn test_new_article_is_filed_once() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let id = article(&store, "a", Duration::minutes(10), now);
        let mut organizer = organizer(store);

        let report = organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(report.to_read, 1);
        assert_eq!(report.newly_tracked, 1);

        let state = organizer.states().get(&id).unwrap().clone();
        assert_eq!(state.current_status, ReadingStatus::ToRead);

        let report = organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(report.moved(), 0);
        assert_eq!(organizer.store().move_count(), 1);
        assert_eq!(organizer.states().get(&id), Some(&state));
    }

    #[tokio::test]
    async fn test_young_article_is_tracked_but_not_moved() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let id = article(&store, "a", Duration::minutes(1), now);
        let mut organizer = organizer(store);

        let report = organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(report.moved(), 0);
        assert_eq!(
            organizer.states().get(&id).unwrap().current_status,
            ReadingStatus::Unclassified
        );

        let report = organizer
            .run_cycle_at(now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(report.to_read, 1);
    }

    #[tokio::test]
    async fn test_transition_into_current_folder_is_not_counted_as_move() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let to_read = store.insert_folder("To Read", &FolderId::root());
        let id = article(&store, "a", Duration::minutes(1), now);
        let mut organizer = organizer(store);

        organizer.run_cycle_at(now).await.unwrap();
        organizer
            .store()
            .update_document(&id, |r| r.parent_folder_id = to_read.clone());

        let report = organizer
            .run_cycle_at(now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(report.to_read, 0);
        assert_eq!(report.moved(), 0);
        assert_eq!(report.already_in_place, 1);
        assert_eq!(organizer.store().move_count(), 0);
        assert_eq!(
            organizer.states().get(&id).unwrap().current_status,
            ReadingStatus::ToRead
        );
    }

    #[tokio::test]
    async fn test_one_transition_per_cycle() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let id = article(&store, "a", Duration::days(1), now);
        store.update_document(&id, |r| r.per_page_annotation_counts = vec![1; 10]);
        let mut organizer = organizer(store);

        organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(
            organizer.states().get(&id).unwrap().current_status,
            ReadingStatus::ToRead
        );

        organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(
            organizer.states().get(&id).unwrap().current_status,
            ReadingStatus::Read
        );
        assert_eq!(organizer.store().move_count(), 2);
    }

    #[tokio::test]
    async fn test_adopts_documents_already_filed() {
        let now = Utc::now();
        let store = MemoryStore::new();
        let read = store.insert_folder("Read Articles", &FolderId::root());
        let id = article(&store, "a", Duration::days(3), now);
        store.update_document(&id, |r| r.parent_folder_id = read.clone());
        let mut organizer = organizer(store);

        let report = organizer.run_cycle_at(now).await.unwrap();
        assert_eq!(report.adopted, 1);
        assert_eq!(report.moved(), 0);

        let state = organizer.states().get(&id).unwrap();
        assert_eq!(state.current_status, ReadingStatus::Read);
        assert_eq!(state.transition_history[0].rule, ADOPTED_RULE);
        assert_eq!(organizer.store().document(&id).unwrap().parent_folder_id, read);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let mut organizer = organizer(store);

        let err = organizer.run_once().await.unwrap_err();
        assert!(!err.is_per_document());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_runs_no_cycle() {
        let now = Utc::now();
        let store = MemoryStore::new();
        article(&store, "a", Duration::days(1), now);
        let mut organizer = organizer(store);

        let (_tx, rx) = watch::channel(true);
        organizer.run_continuous(rx).await.unwrap();
        assert_eq!(organizer.store().move_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_stops_between_cycles() {
        let now = Utc::now();
        let store = MemoryStore::new();
        article(&store, "a", Duration::days(1), now);
        let mut organizer = organizer(store);

        let (tx, rx) = watch::channel(false);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(95)).await;
            tx.send(true).unwrap();
        });

        organizer.run_continuous(rx).await.unwrap();
        stopper.await.unwrap();
        assert_eq!(organizer.store().move_count(), 1);
    }
}
