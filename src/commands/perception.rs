//! Route and merge command handlers.

use anyhow::Context;
use sightline::aggregation::DetectionAggregator;
use sightline::config::SightlineConfig;
use sightline::models::RawDetection;
use sightline::routing::IntentRouter;
use std::path::Path;

/// Route command.
pub fn cmd_route(config: &SightlineConfig, text: &str, json: bool) -> anyhow::Result<()> {
    let router = IntentRouter::new(&config.router)?;
    let decision = router.route(text);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("Pipeline: {}", decision.pipeline);
    println!("Method:   {}", decision.method);
    if let Some(phrase) = &decision.phrase {
        println!("Phrase:   {phrase}");
    }
    println!("Score:    {:.3}", decision.score);
    println!("Elapsed:  {}us", decision.elapsed.as_micros());
    Ok(())
}

/// Merge command.
pub fn cmd_merge(
    config: &SightlineConfig,
    general: &Path,
    open: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let general_records = read_detections(general)?;
    let open_records = read_detections(open)?;

    let aggregator = DetectionAggregator::new(&config.aggregator);
    let result = aggregator.merge_raw(("general", general_records), ("open", open_records));

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.narration);
    println!();
    for (i, record) in result.set.records.iter().enumerate() {
        let marker = if i < result.set.priority_count { "!" } else { " " };
        println!(
            "{marker} {:<24} {:.2}  ({})",
            record.label, record.confidence, record.source
        );
    }
    if result.set.dropped > 0 {
        println!();
        println!("Dropped {} malformed detection(s)", result.set.dropped);
    }
    Ok(())
}

fn read_detections(path: &Path) -> anyhow::Result<Vec<RawDetection>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}
