//! Trigger phrase lists.

use super::Pipeline;
use crate::models::normalize_text;
use crate::{Error, Result};
use std::collections::HashMap;

/// Deep-analysis triggers, in declaration (tie-break) order.
pub const DEFAULT_DEEP_PHRASES: &[&str] = &[
    "explain",
    "describe",
    "describe the scene",
    "tell me more",
    "what's happening",
    "what is happening",
    "read this",
    "read the text",
    "analyze",
    "in detail",
    "what does it say",
    "help me understand",
    "look closely",
];

/// Navigation triggers, in declaration (tie-break) order.
pub const DEFAULT_NAVIGATION_PHRASES: &[&str] = &[
    "navigate",
    "take me to",
    "directions",
    "how do i get to",
    "guide me",
    "where is the nearest",
    "lead me",
    "walk me to",
    "route to",
    "find the exit",
    "find the door",
];

/// Fast-detection triggers, in declaration (tie-break) order.
pub const DEFAULT_FAST_PHRASES: &[&str] = &[
    "what do you see",
    "what you see",
    "what's in front",
    "what is in front",
    "what's around",
    "what is around",
    "any objects",
    "scan",
    "detect",
    "look around",
    "what's there",
    "identify",
];

/// A normalized trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Normalized text.
    pub text: String,
    /// Tokens of the normalized text.
    pub tokens: Vec<String>,
}

impl Phrase {
    fn new(raw: &str) -> Option<Self> {
        let text = normalize_text(raw);
        if text.is_empty() {
            return None;
        }
        let tokens = text.split(' ').map(str::to_string).collect();
        Some(Self { text, tokens })
    }

    /// Returns whether this phrase occurs anywhere in `normalized`.
    ///
    /// Matching is plain substring containment, so "explaining" contains
    /// "explain".
    #[must_use]
    pub fn occurs_in(&self, normalized: &str) -> bool {
        normalized.contains(self.text.as_str())
    }
}

/// Three disjoint, ordered phrase lists.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    deep: Vec<Phrase>,
    navigation: Vec<Phrase>,
    fast: Vec<Phrase>,
}

impl PhraseSet {
    /// Builds a phrase set from raw lists.
    ///
    /// Phrases are normalized; blanks and duplicates within one list are
    /// dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a list ends up empty or if one
    /// normalized phrase appears in two lists.
    pub fn new<S: AsRef<str>>(deep: &[S], navigation: &[S], fast: &[S]) -> Result<Self> {
        let set = Self {
            deep: build_list(Pipeline::Deep, deep)?,
            navigation: build_list(Pipeline::Navigation, navigation)?,
            fast: build_list(Pipeline::Fast, fast)?,
        };
        set.check_disjoint()?;
        Ok(set)
    }

    /// Returns the built-in phrase set.
    #[must_use]
    pub fn defaults() -> Self {
        let build = |raw: &[&str]| raw.iter().filter_map(|p| Phrase::new(p)).collect();
        Self {
            deep: build(DEFAULT_DEEP_PHRASES),
            navigation: build(DEFAULT_NAVIGATION_PHRASES),
            fast: build(DEFAULT_FAST_PHRASES),
        }
    }

    /// Returns the phrases for one pipeline, in declaration order.
    #[must_use]
    pub fn for_pipeline(&self, pipeline: Pipeline) -> &[Phrase] {
        match pipeline {
            Pipeline::Deep => &self.deep,
            Pipeline::Navigation => &self.navigation,
            Pipeline::Fast => &self.fast,
        }
    }

    fn check_disjoint(&self) -> Result<()> {
        let mut owners: HashMap<&str, Pipeline> = HashMap::new();
        for pipeline in Pipeline::PRECEDENCE {
            for phrase in self.for_pipeline(pipeline) {
                if let Some(owner) = owners.insert(phrase.text.as_str(), pipeline)
                    && owner != pipeline
                {
                    return Err(Error::InvalidInput(format!(
                        "phrase '{}' is listed for both {owner} and {pipeline}",
                        phrase.text
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for PhraseSet {
    fn default() -> Self {
        Self::defaults()
    }
}

fn build_list<S: AsRef<str>>(pipeline: Pipeline, raw: &[S]) -> Result<Vec<Phrase>> {
    let mut phrases: Vec<Phrase> = Vec::with_capacity(raw.len());
    for phrase in raw.iter().filter_map(|p| Phrase::new(p.as_ref())) {
        if !phrases.iter().any(|p| p.text == phrase.text) {
            phrases.push(phrase);
        }
    }
    if phrases.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{pipeline} phrase list must not be empty"
        )));
    }
    Ok(phrases)
}
