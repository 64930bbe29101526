//! Deep analysis and tier status command handlers.

use super::vocab::{format_timestamp_ms, open_vocabulary};
use anyhow::Context;
use sightline::config::SightlineConfig;
use sightline::models::{Frame, VocabularyOrigin};
use sightline::tiers::{CascadingExecutor, TierRequest, build_tier_backends};
use std::path::Path;

fn build_executor(config: &SightlineConfig) -> anyhow::Result<CascadingExecutor> {
    let tiers = build_tier_backends(&config.tiers).context("add [[tiers]] entries to the config file")?;
    Ok(CascadingExecutor::new(tiers, config.executor.clone())?)
}

fn load_frame(image: Option<&Path>) -> anyhow::Result<Frame> {
    let Some(path) = image else {
        return Ok(Frame::empty());
    };
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut frame = Frame::jpeg(0, 0, data);
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
    {
        frame.mime_type = "image/png";
    }
    Ok(frame)
}

/// Analyze command.
pub async fn cmd_analyze(
    config: &SightlineConfig,
    query: &str,
    image: Option<&Path>,
    learn: bool,
    json: bool,
) -> anyhow::Result<()> {
    let executor = build_executor(config)?;
    let frame = load_frame(image)?;
    let response = executor.execute(TierRequest::new(query, frame)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.text);
        println!();
        println!(
            "(tier {} \"{}\", {} call(s), {}ms)",
            response.tier_rank, response.tier_name, response.attempts, response.elapsed_ms
        );
    }

    if learn {
        let vocabulary = open_vocabulary(config)?;
        let added = vocabulary.ingest(&response.text, VocabularyOrigin::DeepAnalysis);
        if !added.is_empty() {
            println!("Learned: {}", added.join(", "));
        }
    }
    Ok(())
}

/// Tiers command.
pub async fn cmd_tiers(config: &SightlineConfig, probe: bool) -> anyhow::Result<()> {
    let executor = build_executor(config)?;
    // A fresh process starts with every tier available, so probe them all.
    if probe {
        for rank in 0..executor.tier_count() {
            executor.probe(rank).await?;
        }
    }

    println!("{:<6} {:<24} {:<10} SINCE", "RANK", "NAME", "HEALTH");
    for tier in executor.tier_snapshot() {
        println!(
            "{:<6} {:<24} {:<10} {}",
            tier.rank,
            tier.name,
            tier.health.as_str(),
            format_timestamp_ms(tier.last_transition)
        );
    }
    Ok(())
}
