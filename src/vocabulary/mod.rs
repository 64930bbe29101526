//! Adaptive vocabulary.
//!
//! Grows the open-vocabulary detector's label set at runtime from three
//! sources: free text returned by deep analysis, point-of-interest name
//! lists and user-tagged memories. Every acknowledged change is persisted
//! before the call returns, and the active set is bounded with
//! least-recently-confirmed eviction.
//!
//! ```text
//! text ──▶ PhraseExtractor ──┐
//!                            ├──▶ normalize / filter ──▶ VocabularyState ──▶ VocabularyStore
//! name list ─────────────────┘                                  │
//!                                                               └──▶ OpenVocabularyDetector
//! ```

mod extraction;
mod manager;
mod state;
mod store;

pub use extraction::HeuristicPhraseExtractor;
pub use manager::VocabularyManager;
pub use state::{Upsert, VocabularyState};
pub use store::{FilesystemVocabularyStore, MemoryVocabularyStore};

use crate::Result;
use crate::config::{env_parse, expand_home};
use crate::models::VocabularySnapshot;
use std::path::PathBuf;

/// Phrases never learned, whatever the source.
pub const DEFAULT_STOP_PHRASES: &[&str] = &[
    "thing",
    "something",
    "anything",
    "object",
    "item",
    "area",
    "image",
    "picture",
    "photo",
    "scene",
    "view",
    "camera",
    "background",
    "foreground",
    "side",
    "way",
    "lot",
    "bit",
    "kind",
    "sort",
];

/// Extracts noun or object phrases from free text.
///
/// Stands in for an NLP service; see [`HeuristicPhraseExtractor`] for the
/// built-in fallback.
pub trait PhraseExtractor: Send + Sync {
    /// Returns candidate phrases in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns an error if the extraction service fails.
    fn extract_noun_phrases(&self, text: &str) -> Result<Vec<String>>;
}

/// Durable storage for the vocabulary snapshot.
pub trait VocabularyStore: Send + Sync {
    /// Loads the stored snapshot, or `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data cannot be read or parsed.
    fn load(&self) -> Result<Option<VocabularySnapshot>>;

    /// Durably replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be written.
    fn save(&self, snapshot: &VocabularySnapshot) -> Result<()>;
}

/// Vocabulary configuration.
#[derive(Debug, Clone)]
pub struct VocabularyConfig {
    /// Maximum number of active phrases.
    pub capacity: usize,
    /// Snapshot file.
    pub store_path: PathBuf,
    /// Persist latency above which a warning is logged.
    pub persist_budget_ms: u64,
    /// Additional phrases never learned.
    pub stop_phrases: Vec<String>,
    /// Longest phrase accepted, in words.
    pub max_phrase_words: usize,
    /// Phrases installed when no snapshot exists yet.
    pub seed: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            store_path: default_store_path(),
            persist_budget_ms: 20,
            stop_phrases: Vec::new(),
            max_phrase_words: 3,
            seed: Vec::new(),
        }
    }
}

impl VocabularyConfig {
    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse::<usize>("SIGHTLINE_VOCABULARY_CAPACITY") {
            self.capacity = v.max(1);
        }
        if let Ok(path) = std::env::var("SIGHTLINE_VOCABULARY_PATH")
            && !path.trim().is_empty()
        {
            self.store_path = expand_home(path.trim());
        }
        if let Some(v) = env_parse::<u64>("SIGHTLINE_VOCABULARY_PERSIST_BUDGET_MS") {
            self.persist_budget_ms = v;
        }
        self
    }
}

fn default_store_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("sightline-vocabulary.json"),
        |dirs| {
            dirs.data_local_dir()
                .join("sightline")
                .join("vocabulary.json")
        },
    )
}
