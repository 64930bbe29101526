//! Built-in phrase extraction.

use super::PhraseExtractor;
use crate::Result;
use crate::models::normalize_text;

/// Function words, pronouns, common verbs and spatial words that end a phrase.
const BREAK_WORDS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "there", "here", "it", "its", "it's",
    "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
    "i", "you", "your", "we", "they", "he", "she", "them", "his", "her", "their", "my", "our",
    "and", "or", "but", "of", "on", "in", "at", "to", "from", "with", "without", "by", "for",
    "near", "next", "behind", "beside", "between", "above", "below", "under", "over", "into",
    "onto", "left", "right", "front", "back", "ahead", "towards", "toward", "around", "up",
    "down", "see", "seems", "looks", "appears", "can", "could", "would", "should", "may",
    "might", "some", "any", "few", "several", "many", "one", "two", "three", "very", "also",
    "just", "about", "like", "what", "which", "who", "where", "not", "no", "yes", "there's",
    "what's", "that's", "while", "as", "if", "so", "then", "than",
];

/// Splits text into noun-phrase-like runs without an NLP model.
///
/// Text is cut at punctuation and at [`BREAK_WORDS`]; each remaining run of
/// content words is kept, trimmed to its last `max_words` words (the head
/// noun and its nearest modifiers). Pure numbers are skipped.
#[derive(Debug, Clone)]
pub struct HeuristicPhraseExtractor {
    max_words: usize,
}

impl Default for HeuristicPhraseExtractor {
    fn default() -> Self {
        Self::new(3)
    }
}

impl HeuristicPhraseExtractor {
    /// Creates an extractor keeping at most `max_words` words per phrase.
    #[must_use]
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words: max_words.max(1),
        }
    }

    fn push_run(&self, run: &mut Vec<&str>, phrases: &mut Vec<String>) {
        if !run.is_empty() {
            let start = run.len().saturating_sub(self.max_words);
            let phrase = run[start..].join(" ");
            if !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
            run.clear();
        }
    }
}

impl PhraseExtractor for HeuristicPhraseExtractor {
    fn extract_noun_phrases(&self, text: &str) -> Result<Vec<String>> {
        let mut phrases = Vec::new();
        for clause in text.split(['.', ',', ';', ':', '!', '?', '(', ')', '\n', '"']) {
            let clause = normalize_text(clause);
            let mut run: Vec<&str> = Vec::new();
            for word in clause.split(' ').filter(|w| !w.is_empty()) {
                let is_break = BREAK_WORDS.contains(&word)
                    || word.chars().all(|c| c.is_ascii_digit())
                    || word.len() < 2;
                if is_break {
                    self.push_run(&mut run, &mut phrases);
                } else {
                    run.push(word);
                }
            }
            self.push_run(&mut run, &mut phrases);
        }
        Ok(phrases)
    }
}
