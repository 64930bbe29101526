//! Typo-tolerant, word-order-robust phrase similarity.
//!
//! Scores are in `[0, 1]`. The utterance score against a phrase is the
//! larger of two measures:
//!
//! - **coverage**: for each phrase token, the best character ratio against
//!   any utterance token, averaged with token length as the weight. Long
//!   content words dominate short function words.
//! - **token sort ratio**: the character ratio between both token lists
//!   after sorting, which absorbs reordering of short utterances.

use super::phrases::Phrase;

/// Levenshtein edit distance over Unicode scalar values.
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Normalized similarity `1 - distance / max_len`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / max_len as f32
}

/// Ratio between the sorted token lists of both inputs.
#[must_use]
pub fn token_sort_ratio(a: &[&str], b: &[String]) -> f32 {
    let mut left: Vec<&str> = a.to_vec();
    let mut right: Vec<&str> = b.iter().map(String::as_str).collect();
    left.sort_unstable();
    right.sort_unstable();
    ratio(&left.join(" "), &right.join(" "))
}

/// Length-weighted mean of each phrase token's best match in the utterance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage(utterance_tokens: &[&str], phrase_tokens: &[String]) -> f32 {
    if utterance_tokens.is_empty() || phrase_tokens.is_empty() {
        return 0.0;
    }
    let mut weighted = 0.0_f32;
    let mut total_weight = 0.0_f32;
    for token in phrase_tokens {
        let weight = token.chars().count() as f32;
        let best = utterance_tokens
            .iter()
            .map(|candidate| ratio(candidate, token))
            .fold(0.0_f32, f32::max);
        weighted += best * weight;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        0.0
    } else {
        weighted / total_weight
    }
}

/// Similarity between a tokenized utterance and one phrase.
#[must_use]
pub fn phrase_similarity(utterance_tokens: &[&str], phrase: &Phrase) -> f32 {
    if utterance_tokens.is_empty() {
        return 0.0;
    }
    coverage(utterance_tokens, &phrase.tokens)
        .max(token_sort_ratio(utterance_tokens, &phrase.tokens))
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tokens(s: &str) -> Vec<String> {
        s.split(' ').map(str::to_string).collect()
    }

    #[test_case("kitten", "sitting", 3 ; "classic")]
    #[test_case("", "abc", 3 ; "empty left")]
    #[test_case("abc", "", 3 ; "empty right")]
    #[test_case("describe", "descrbe", 1 ; "dropped letter")]
    #[test_case("café", "cafe", 1 ; "unicode")]
    fn test_levenshtein(a: &str, b: &str, expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!((ratio("", "") - 1.0).abs() < f32::EPSILON);
        assert!((ratio("same", "same") - 1.0).abs() < f32::EPSILON);
        assert!(ratio("abc", "xyz").abs() < f32::EPSILON);
    }

    #[test]
    fn test_token_sort_ignores_order() {
        let score = token_sort_ratio(&["see", "you", "what", "do"], &tokens("what do you see"));
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_coverage_weights_long_tokens() {
        // "tell" vs "take" is a weak match; short exact hits on "me"/"to"
        // must not lift the score over the routing threshold.
        let score = coverage(&["tell", "me", "what", "to", "do"], &tokens("take me to"));
        assert!(score < 0.7, "score was {score}");
    }

    #[test]
    fn test_coverage_tolerates_typos() {
        let score = coverage(&["look", "arund"], &tokens("look around"));
        assert!(score > 0.85, "score was {score}");
    }
}
