//! Config command handler.
//!
//! Prints the effective configuration after file, environment and default
//! layering.

use sightline::config::{SightlineConfig, TierBackendKind};

/// Config command.
pub fn cmd_config(config: &SightlineConfig) -> anyhow::Result<()> {
    println!("Current Configuration");
    println!("=====================");
    println!();

    println!("Config Files Loaded:");
    if config.config_sources.is_empty() {
        println!("  (none - using defaults)");
    } else {
        for source in &config.config_sources {
            println!("  - {}", source.display());
        }
    }
    println!();

    println!("Router:");
    println!(
        "  Similarity Threshold: {:.2}",
        config.router.similarity_threshold
    );
    println!(
        "  Phrase Overrides: deep={} navigation={} fast={}",
        override_label(config.router.deep_phrases.as_deref()),
        override_label(config.router.navigation_phrases.as_deref()),
        override_label(config.router.fast_phrases.as_deref()),
    );
    println!();

    let executor = &config.executor;
    println!("Executor:");
    println!("  Max Attempts: {}", executor.max_attempts);
    println!(
        "  Backoff: {}ms base, {}ms max",
        executor.backoff_base_ms, executor.backoff_max_ms
    );
    println!("  Attempt Timeout: {}ms", executor.attempt_timeout_ms);
    if executor.exhausted_cooldown_ms == 0 {
        println!("  Exhausted Cooldown: disabled");
    } else {
        println!("  Exhausted Cooldown: {}ms", executor.exhausted_cooldown_ms);
    }
    if executor.probe_interval_ms == 0 {
        println!("  Recovery Probes: disabled");
    } else {
        println!("  Recovery Probes: every {}ms", executor.probe_interval_ms);
    }
    println!();

    println!("Tiers:");
    if config.tiers.is_empty() {
        println!("  (none configured)");
    }
    for (rank, tier) in config.tiers.iter().enumerate() {
        print!("  {rank}. {} [{}]", tier.name, tier.backend.kind());
        if let TierBackendKind::Http {
            endpoint, model, ..
        } = &tier.backend
        {
            print!(" {endpoint}");
            if let Some(model) = model {
                print!(" model={model}");
            }
        }
        if let Some(timeout) = tier.timeout_ms {
            print!(" timeout={timeout}ms");
        }
        println!();
    }
    println!();

    println!("Aggregator:");
    println!(
        "  Priority Labels: {}",
        config.aggregator.priority_labels.join(", ")
    );
    println!("  Narration Limit: {}", config.aggregator.narration_limit);
    println!();

    let vocabulary = &config.vocabulary;
    println!("Vocabulary:");
    println!("  Capacity: {}", vocabulary.capacity);
    println!("  Store: {}", vocabulary.store_path.display());
    println!("  Persist Budget: {}ms", vocabulary.persist_budget_ms);
    println!("  Max Phrase Words: {}", vocabulary.max_phrase_words);
    if !vocabulary.seed.is_empty() {
        println!("  Seed: {}", vocabulary.seed.join(", "));
    }
    println!();

    println!("Observability:");
    match &config.observability.logging {
        Some(logging) => {
            println!(
                "  Logging: format={} level={}",
                logging.format.as_deref().unwrap_or("(default)"),
                logging.level.as_deref().unwrap_or("(default)")
            );
            if let Some(file) = &logging.file {
                println!("    File: {file}");
            }
        },
        None => println!("  Logging: (default)"),
    }
    let metrics_enabled = config
        .observability
        .metrics
        .as_ref()
        .and_then(|m| m.enabled)
        .unwrap_or(false);
    println!(
        "  Metrics: {}",
        if metrics_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    if metrics_enabled
        && let Some(port) = config.observability.metrics.as_ref().and_then(|m| m.port)
    {
        println!("    Prometheus Port: {port}");
    }

    Ok(())
}

fn override_label(phrases: Option<&[String]>) -> String {
    phrases.map_or_else(|| "builtin".to_string(), |p| format!("{} custom", p.len()))
}
