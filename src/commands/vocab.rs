//! Vocabulary command handlers.

use super::VocabAction;
use sightline::config::SightlineConfig;
use sightline::models::VocabularyOrigin;
use sightline::vocabulary::{FilesystemVocabularyStore, HeuristicPhraseExtractor, VocabularyManager};
use std::sync::Arc;

/// Opens the configured vocabulary.
pub fn open_vocabulary(config: &SightlineConfig) -> anyhow::Result<VocabularyManager> {
    let store = Arc::new(FilesystemVocabularyStore::new(
        config.vocabulary.store_path.clone(),
    ));
    let extractor = Arc::new(HeuristicPhraseExtractor::new(
        config.vocabulary.max_phrase_words,
    ));
    Ok(VocabularyManager::open(&config.vocabulary, store, extractor)?)
}

/// Vocab command.
pub fn cmd_vocab(config: &SightlineConfig, action: VocabAction) -> anyhow::Result<()> {
    let manager = open_vocabulary(config)?;

    match action {
        VocabAction::List { json } => {
            let entries = manager.entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!(
                "Vocabulary ({}/{}) at {}",
                entries.len(),
                manager.capacity(),
                config.vocabulary.store_path.display()
            );
            for entry in entries {
                println!(
                    "  {:<32} {:<18} {}",
                    entry.phrase,
                    entry.origin.as_str(),
                    format_timestamp_ms(entry.last_confirmed)
                );
            }
        },
        VocabAction::Learn { text, origin } => {
            let origin: VocabularyOrigin = origin.parse()?;
            report(&manager.ingest(&text.join(" "), origin));
        },
        VocabAction::Add { phrases, origin } => {
            let origin: VocabularyOrigin = origin.parse()?;
            report(&manager.ingest_list(&phrases, origin));
        },
    }
    Ok(())
}

/// Formats a Unix millisecond timestamp for display.
pub fn format_timestamp_ms(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(i64::try_from(ms).unwrap_or(0)).map_or_else(
        || "unknown".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn report(added: &[String]) {
    if added.is_empty() {
        println!("No new phrases");
    } else {
        println!("Learned {} phrase(s):", added.len());
        for phrase in added {
            println!("  + {phrase}");
        }
    }
}
