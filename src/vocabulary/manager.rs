//! Vocabulary manager: learn, persist, reconfigure.

use super::{
    DEFAULT_STOP_PHRASES, PhraseExtractor, Upsert, VocabularyConfig, VocabularyState,
    VocabularyStore,
};
use crate::aggregation::normalize_label;
use crate::models::{
    EventMeta, TelemetryEvent, VocabularyEntry, VocabularyOrigin, VocabularySnapshot,
};
use crate::observability::{TelemetrySink, noop_sink};
use crate::perception::OpenVocabularyDetector;
use crate::{Result, current_timestamp_ms};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Owns the active vocabulary.
///
/// All mutations go through one writer lock: a tentative copy of the state is
/// changed, saved, and only then committed and pushed to the detector. A
/// failed save leaves the state untouched, so memory never runs ahead of
/// storage.
pub struct VocabularyManager {
    state: Mutex<VocabularyState>,
    store: Arc<dyn VocabularyStore>,
    extractor: Arc<dyn PhraseExtractor>,
    detector: Option<Arc<dyn OpenVocabularyDetector>>,
    telemetry: Arc<dyn TelemetrySink>,
    stop_phrases: HashSet<String>,
    max_phrase_words: usize,
    persist_budget: Duration,
}

impl VocabularyManager {
    /// Hydrates the manager from `store`, seeding it from configuration when
    /// nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored snapshot exists but cannot be read.
    pub fn open(
        config: &VocabularyConfig,
        store: Arc<dyn VocabularyStore>,
        extractor: Arc<dyn PhraseExtractor>,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let stored = store.load()?;
        let hydrated = stored.is_some();
        let state = stored.map_or_else(
            || VocabularyState::new(capacity),
            |snapshot| {
                if snapshot.entries.len() > capacity.get() {
                    tracing::info!(
                        stored = snapshot.entries.len(),
                        capacity = capacity.get(),
                        "Stored vocabulary exceeds capacity, keeping most recent"
                    );
                }
                VocabularyState::from_snapshot(&snapshot, capacity)
            },
        );

        let stop_phrases = DEFAULT_STOP_PHRASES
            .iter()
            .map(|p| (*p).to_string())
            .chain(config.stop_phrases.iter().map(|p| normalize_label(p)))
            .filter(|p| !p.is_empty())
            .collect();

        let manager = Self {
            state: Mutex::new(state),
            store,
            extractor,
            detector: None,
            telemetry: noop_sink(),
            stop_phrases,
            max_phrase_words: config.max_phrase_words.max(1),
            persist_budget: Duration::from_millis(config.persist_budget_ms),
        };

        if hydrated {
            tracing::info!(active = manager.len(), "Vocabulary hydrated");
        } else if !config.seed.is_empty() {
            let seeded = manager.ingest_list(&config.seed, VocabularyOrigin::Manual);
            tracing::info!(seeded = seeded.len(), "Vocabulary seeded");
        }
        Ok(manager)
    }

    /// Attaches the detector and pushes the current active set to it.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn OpenVocabularyDetector>) -> Self {
        self.detector = Some(detector);
        if let Err(e) = self.resync_detector() {
            tracing::warn!(error = %e, "Initial detector vocabulary push failed");
        }
        self
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Learns phrases from free text.
    ///
    /// Returns the phrases that were newly added. Extraction or persistence
    /// failures are logged and yield an empty list.
    #[tracing::instrument(skip(self, text), fields(len = text.len()))]
    pub fn ingest(&self, text: &str, origin: VocabularyOrigin) -> Vec<String> {
        match self.extractor.extract_noun_phrases(text) {
            Ok(candidates) => self.ingest_list(&candidates, origin),
            Err(e) => {
                tracing::warn!(error = %e, "Phrase extraction failed");
                metrics::counter!(
                    "vocabulary_extraction_failures_total",
                    "origin" => origin.as_str()
                )
                .increment(1);
                self.reject(origin, format!("extraction failed: {e}"));
                Vec::new()
            },
        }
    }

    /// Learns a list of names, skipping extraction.
    ///
    /// Names already active are confirmed (their recency refreshed) but not
    /// reported as added.
    pub fn ingest_list<S: AsRef<str>>(&self, names: &[S], origin: VocabularyOrigin) -> Vec<String> {
        let mut seen = HashSet::new();
        let candidates: Vec<String> = names
            .iter()
            .filter_map(|name| self.prepare(name.as_ref()))
            .filter(|phrase| seen.insert(phrase.clone()))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = current_timestamp_ms();
        let mut next = state.fork();
        let mut added = Vec::new();
        let mut evicted = Vec::new();
        let mut confirmed = 0_usize;
        for phrase in candidates {
            match next.upsert(&phrase, origin, now) {
                Upsert::Added { evicted: dropped } => {
                    evicted.extend(dropped.map(|entry| entry.phrase));
                    added.push(phrase);
                },
                Upsert::Confirmed => confirmed += 1,
            }
        }
        // A batch larger than the capacity can evict its own phrases.
        added.retain(|phrase| next.contains(phrase));
        evicted.retain(|phrase| state.contains(phrase));

        if added.is_empty() && confirmed == 0 {
            return Vec::new();
        }

        if let Err(e) = self.persist(&next.snapshot()) {
            tracing::error!(error = %e, %origin, "Vocabulary persist failed, update discarded");
            metrics::counter!("vocabulary_persist_failures_total").increment(1);
            self.reject(origin, format!("persist failed: {e}"));
            return Vec::new();
        }
        *state = next;

        if !added.is_empty() || !evicted.is_empty() {
            let active = state.active_phrases();
            self.push_to_detector(&active);
        }

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!("vocabulary_size").set(state.len() as f64);
        if !added.is_empty() {
            metrics::counter!("vocabulary_learned_total", "origin" => origin.as_str())
                .increment(added.len() as u64);
            tracing::info!(
                %origin,
                added = ?added,
                evicted = ?evicted,
                active = state.len(),
                "Vocabulary learned"
            );
            self.telemetry.emit(TelemetryEvent::VocabularyLearned {
                meta: EventMeta::new("vocabulary", None),
                origin,
                added: added.clone(),
                evicted,
                active: state.len(),
            });
        }
        added
    }

    /// Normalizes and filters one candidate phrase.
    fn prepare(&self, name: &str) -> Option<String> {
        let phrase = normalize_label(name);
        let words = phrase.split(' ').filter(|w| !w.is_empty()).count();
        if words == 0 || phrase.chars().count() < 2 {
            return None;
        }
        if words > self.max_phrase_words {
            tracing::debug!(phrase = %phrase, words, "Skipping overlong phrase");
            return None;
        }
        if phrase.chars().all(|c| c.is_numeric() || c == ' ') {
            return None;
        }
        if self.stop_phrases.contains(&phrase) {
            return None;
        }
        Some(phrase)
    }

    fn persist(&self, snapshot: &VocabularySnapshot) -> Result<()> {
        let start = Instant::now();
        self.store.save(snapshot)?;
        let elapsed = start.elapsed();
        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("vocabulary_persist_duration_ms")
            .record(elapsed.as_secs_f64() * 1000.0);
        if elapsed > self.persist_budget {
            tracing::warn!(
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                budget_ms = u64::try_from(self.persist_budget.as_millis()).unwrap_or(u64::MAX),
                "Vocabulary persist exceeded latency budget"
            );
            metrics::counter!("vocabulary_persist_over_budget_total").increment(1);
        }
        Ok(())
    }

    fn push_to_detector(&self, active: &[String]) {
        if let Some(detector) = &self.detector
            && let Err(e) = detector.set_active_vocabulary(active)
        {
            tracing::warn!(detector = detector.id(), error = %e, "Detector vocabulary push failed");
            metrics::counter!("vocabulary_detector_push_failures_total").increment(1);
        }
    }

    fn reject(&self, origin: VocabularyOrigin, reason: String) {
        self.telemetry.emit(TelemetryEvent::VocabularyRejected {
            meta: EventMeta::new("vocabulary", None),
            origin,
            reason,
        });
    }

    /// Pushes the current active set to the detector again.
    ///
    /// Reconfiguration is idempotent, so this is safe after a detector
    /// restart or at any other time.
    ///
    /// # Errors
    ///
    /// Returns the detector's error.
    pub fn resync_detector(&self) -> Result<()> {
        let Some(detector) = &self.detector else {
            return Ok(());
        };
        let active = self.active_phrases();
        detector.set_active_vocabulary(&active)
    }

    /// Returns the active phrases, least recently confirmed first.
    #[must_use]
    pub fn active_phrases(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active_phrases()
    }

    /// Returns a copy of all entries, least recently confirmed first.
    #[must_use]
    pub fn entries(&self) -> Vec<VocabularyEntry> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .cloned()
            .collect()
    }

    /// Returns the durable form of the current state.
    #[must_use]
    pub fn snapshot(&self) -> VocabularySnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Returns the number of phrases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns whether no phrase is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity()
    }
}
