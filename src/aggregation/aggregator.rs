//! Two-stream detection merge.

use super::{AggregatorConfig, Narration, normalize_label};
use crate::models::{DetectionRecord, EventMeta, MergedDetectionSet, RawDetection, TelemetryEvent};
use crate::observability::{TelemetrySink, noop_sink};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Output of one merge: the structured set and its spoken rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Deduplicated, priority-ordered records.
    pub set: MergedDetectionSet,
    /// Rendering for narration.
    pub narration: Narration,
}

impl AggregationResult {
    /// Returns the result for a cycle with no usable detections.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            set: MergedDetectionSet::default(),
            narration: Narration::NoDetections,
        }
    }
}

/// Merges the general and the open-vocabulary detection streams.
pub struct DetectionAggregator {
    priority: HashSet<String>,
    narration_limit: usize,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Default for DetectionAggregator {
    fn default() -> Self {
        Self::new(&AggregatorConfig::default())
    }
}

impl DetectionAggregator {
    /// Creates an aggregator. Priority labels are normalized like detections.
    #[must_use]
    pub fn new(config: &AggregatorConfig) -> Self {
        let priority = config
            .priority_labels
            .iter()
            .map(|l| normalize_label(l))
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            priority,
            narration_limit: config.narration_limit.max(1),
            telemetry: noop_sink(),
        }
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns whether `label` (already normalized) is a priority label.
    #[must_use]
    pub fn is_priority(&self, label: &str) -> bool {
        self.priority.contains(label)
    }

    /// Merges two streams from the same observation instant.
    ///
    /// Labels are normalized; for a repeated label the higher-confidence
    /// record survives with its source tag, and the earlier record wins a
    /// tie. Records with a missing label or a confidence outside `[0, 1]`
    /// are dropped. The priority partition is emitted first, each partition
    /// by descending confidence, ties broken by label.
    #[must_use]
    pub fn merge(&self, first: Vec<DetectionRecord>, second: Vec<DetectionRecord>) -> AggregationResult {
        let input = first.len() + second.len();
        self.merge_records(first.into_iter().chain(second).map(Some), input)
    }

    /// Merges two streams in wire form, dropping records without confidence.
    #[must_use]
    pub fn merge_raw(
        &self,
        first: (&str, Vec<RawDetection>),
        second: (&str, Vec<RawDetection>),
    ) -> AggregationResult {
        let (first_source, first) = first;
        let (second_source, second) = second;
        let input = first.len() + second.len();
        let records = first
            .into_iter()
            .map(|raw| raw.into_record(first_source))
            .chain(second.into_iter().map(|raw| raw.into_record(second_source)));
        self.merge_records(records, input)
    }

    fn merge_records(
        &self,
        records: impl Iterator<Item = Option<DetectionRecord>>,
        input: usize,
    ) -> AggregationResult {
        let mut merged: Vec<DetectionRecord> = Vec::with_capacity(input);
        let mut index: HashMap<String, usize> = HashMap::with_capacity(input);
        let mut dropped = 0_usize;

        for record in records {
            let Some(mut record) = record.filter(DetectionRecord::has_valid_confidence) else {
                dropped += 1;
                continue;
            };
            let label = normalize_label(&record.label);
            if label.is_empty() {
                dropped += 1;
                continue;
            }
            record.label = label;
            match index.get(&record.label) {
                Some(&slot) => {
                    if record.confidence > merged[slot].confidence {
                        merged[slot] = record;
                    }
                },
                None => {
                    index.insert(record.label.clone(), merged.len());
                    merged.push(record);
                },
            }
        }

        let (mut priority, mut other): (Vec<_>, Vec<_>) = merged
            .into_iter()
            .partition(|r| self.priority.contains(&r.label));
        priority.sort_by(by_confidence);
        other.sort_by(by_confidence);

        let priority_count = priority.len();
        priority.extend(other);
        let set = MergedDetectionSet {
            records: priority,
            priority_count,
            dropped,
        };

        if dropped > 0 {
            tracing::warn!(dropped, input, "Dropped malformed detections");
            metrics::counter!("aggregator_dropped_total").increment(dropped as u64);
        }
        tracing::debug!(input, output = set.len(), priority = priority_count, "Merged detections");
        metrics::counter!("aggregator_merges_total").increment(1);
        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("aggregator_output_size").record(set.len() as f64);
        self.telemetry.emit(TelemetryEvent::DetectionsMerged {
            meta: EventMeta::new("aggregator", None),
            input,
            output: set.len(),
            priority: priority_count,
            dropped,
        });

        let narration = Narration::from_set(&set, self.narration_limit);
        AggregationResult { set, narration }
    }
}

fn by_confidence(a: &DetectionRecord, b: &DetectionRecord) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.label.cmp(&b.label))
}
