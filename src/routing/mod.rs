//! Intent routing.
//!
//! Classifies an utterance into the fast-detection, deep-analysis or
//! navigation pipeline in two phases:
//!
//! 1. **Phrase scan**: three ordered trigger lists are scanned deep first,
//!    then navigation, then fast. The first substring occurrence wins with
//!    score 1.0, so "explain what you see" goes to deep analysis.
//! 2. **Similarity fallback**: otherwise every phrase is scored with a
//!    typo-tolerant similarity; the best pipeline wins if it reaches the
//!    threshold, and fast detection is used when nothing does.

mod phrases;
mod router;
pub mod similarity;
mod types;

pub use phrases::{
    DEFAULT_DEEP_PHRASES, DEFAULT_FAST_PHRASES, DEFAULT_NAVIGATION_PHRASES, Phrase, PhraseSet,
};
pub use router::IntentRouter;
pub use types::{MatchMethod, Pipeline, RoutingDecision};

use crate::Result;

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Minimum similarity for the fallback phase.
    pub similarity_threshold: f32,
    /// Replacement deep-analysis phrases.
    pub deep_phrases: Option<Vec<String>>,
    /// Replacement navigation phrases.
    pub navigation_phrases: Option<Vec<String>>,
    /// Replacement fast-detection phrases.
    pub fast_phrases: Option<Vec<String>>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: Self::DEFAULT_THRESHOLD,
            deep_phrases: None,
            navigation_phrases: None,
            fast_phrases: None,
        }
    }
}

impl RouterConfig {
    /// Default similarity threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.7;

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = crate::config::env_parse::<f32>("SIGHTLINE_ROUTER_THRESHOLD") {
            self.similarity_threshold = v.clamp(0.0, 1.0);
        }
        self
    }

    /// Builds the phrase set, substituting defaults for lists not overridden.
    ///
    /// # Errors
    ///
    /// Returns an error if a list is empty or lists overlap.
    pub fn phrase_set(&self) -> Result<PhraseSet> {
        let pick = |custom: &Option<Vec<String>>, defaults: &[&str]| -> Vec<String> {
            custom.clone().unwrap_or_else(|| {
                defaults.iter().map(|p| (*p).to_string()).collect()
            })
        };
        PhraseSet::new(
            &pick(&self.deep_phrases, DEFAULT_DEEP_PHRASES),
            &pick(&self.navigation_phrases, DEFAULT_NAVIGATION_PHRASES),
            &pick(&self.fast_phrases, DEFAULT_FAST_PHRASES),
        )
    }
}
