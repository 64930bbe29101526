//! Bounded, recency-ordered vocabulary state.

use crate::models::{VocabularyEntry, VocabularyOrigin, VocabularySnapshot};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Result of inserting a phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The phrase is new; the least recently confirmed entry was evicted if
    /// the state was full.
    Added {
        /// Entry evicted to make room.
        evicted: Option<VocabularyEntry>,
    },
    /// The phrase was already present and is now the most recently confirmed.
    Confirmed,
}

/// The active vocabulary, never larger than its capacity.
#[derive(Debug)]
pub struct VocabularyState {
    entries: LruCache<String, VocabularyEntry>,
}

impl VocabularyState {
    /// Creates an empty state.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Rebuilds state from a snapshot, keeping the most recently confirmed
    /// entries if the snapshot holds more than `capacity`.
    #[must_use]
    pub fn from_snapshot(snapshot: &VocabularySnapshot, capacity: NonZeroUsize) -> Self {
        let mut state = Self::new(capacity);
        for entry in &snapshot.entries {
            state.entries.push(entry.phrase.clone(), entry.clone());
        }
        state
    }

    /// Returns an independent copy to apply a tentative mutation to.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::from_snapshot(&self.snapshot(), self.entries.cap())
    }

    /// Inserts `phrase` or refreshes its recency.
    pub fn upsert(&mut self, phrase: &str, origin: VocabularyOrigin, now_ms: u64) -> Upsert {
        if let Some(entry) = self.entries.get_mut(phrase) {
            entry.last_confirmed = now_ms;
            entry.active = true;
            return Upsert::Confirmed;
        }
        let evicted = self
            .entries
            .push(phrase.to_string(), VocabularyEntry::new(phrase, origin, now_ms))
            .map(|(_, entry)| entry);
        Upsert::Added { evicted }
    }

    /// Returns whether `phrase` is present, without touching recency.
    #[must_use]
    pub fn contains(&self, phrase: &str) -> bool {
        self.entries.contains(phrase)
    }

    /// Returns the entry for `phrase`, without touching recency.
    #[must_use]
    pub fn get(&self, phrase: &str) -> Option<&VocabularyEntry> {
        self.entries.peek(phrase)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the state is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the capacity bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Returns entries least recently confirmed first.
    pub fn entries(&self) -> impl Iterator<Item = &VocabularyEntry> {
        self.entries.iter().rev().map(|(_, entry)| entry)
    }

    /// Returns active phrases least recently confirmed first.
    #[must_use]
    pub fn active_phrases(&self) -> Vec<String> {
        self.entries()
            .filter(|e| e.active)
            .map(|e| e.phrase.clone())
            .collect()
    }

    /// Returns the durable form of this state.
    #[must_use]
    pub fn snapshot(&self) -> VocabularySnapshot {
        VocabularySnapshot {
            version: VocabularySnapshot::CURRENT_VERSION,
            capacity: self.capacity(),
            entries: self.entries().cloned().collect(),
        }
    }
}
