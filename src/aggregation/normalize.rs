//! Label normalization: case folding and singularization.

use crate::models::normalize_text;

/// Plural forms that do not follow the suffix rules.
const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("children", "child"),
    ("mice", "mouse"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
    ("leaves", "leaf"),
    ("shelves", "shelf"),
    ("wolves", "wolf"),
    ("halves", "half"),
    ("loaves", "loaf"),
    ("scarves", "scarf"),
    ("thieves", "thief"),
    ("calves", "calf"),
    ("buses", "bus"),
    ("potatoes", "potato"),
    ("tomatoes", "tomato"),
    ("heroes", "hero"),
];

/// Words whose plural and singular coincide, or that are only used plural.
const INVARIANT: &[&str] = &[
    "glasses", "scissors", "pants", "shorts", "jeans", "trousers", "stairs", "sheep", "fish",
    "deer", "lens", "series", "species", "news", "canvas", "headphones", "binoculars",
];

/// Plurals ending in `ies` whose singular ends in `ie`.
const IE_PLURALS: &[&str] = &[
    "movies", "cookies", "pies", "ties", "hoodies", "brownies", "smoothies", "zombies",
    "selfies", "calories", "lies",
];

/// Normalizes a detector class label.
///
/// Case-folds, strips punctuation, collapses whitespace and singularizes the
/// head noun (the last word), so "Traffic Lights" and "traffic light" compare
/// equal. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let normalized = normalize_text(label);
    match normalized.rsplit_once(' ') {
        Some((head, last)) => {
            let singular = singularize(last);
            if singular.is_empty() {
                head.to_string()
            } else {
                format!("{head} {singular}")
            }
        },
        None => singularize(&normalized),
    }
}

/// Singularizes one lower-case word.
#[must_use]
pub fn singularize(word: &str) -> String {
    let word = word.strip_suffix("'s").unwrap_or(word);
    singular_form(word).trim_matches('\'').to_string()
}

fn singular_form(word: &str) -> String {
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == word) {
        return (*singular).to_string();
    }
    if INVARIANT.contains(&word) {
        return word.to_string();
    }
    if IE_PLURALS.contains(&word) {
        return word[..word.len() - 1].to_string();
    }
    if word.len() > 4
        && let Some(stem) = word.strip_suffix("ies")
    {
        return format!("{stem}y");
    }
    for suffix in ["sses", "shes", "ches", "xes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    let protected = word.len() <= 3
        || word.ends_with("ss")
        || word.ends_with("us")
        || word.ends_with("is");
    if !protected && let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}
