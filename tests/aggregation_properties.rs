//! Property tests for the detection merge.

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use sightline::aggregation::{AggregatorConfig, DetectionAggregator, Narration, normalize_label};
use sightline::models::{DetectionRecord, RawDetection};
use std::collections::{HashMap, HashSet};

const LABELS: &[&str] = &[
    "person", "People", "cup", "cups", "wallet", "dog", "Dogs", "stairs", "bus", "buses",
    "chair", "benches", "traffic light", "Traffic Lights", "car", "bottle",
];

fn record() -> impl Strategy<Value = DetectionRecord> {
    (
        prop::sample::select(vec!["general", "open"]),
        prop::sample::select(LABELS),
        0.0_f32..=1.0,
    )
        .prop_map(|(source, label, confidence)| DetectionRecord::new(source, label, confidence))
}

fn stream() -> impl Strategy<Value = Vec<DetectionRecord>> {
    prop::collection::vec(record(), 0..12)
}

proptest! {
    /// Property: no two output records share a normalized label.
    #[test]
    fn prop_labels_are_unique(first in stream(), second in stream()) {
        let result = DetectionAggregator::default().merge(first, second);
        let mut seen = HashSet::new();
        for record in &result.set.records {
            prop_assert!(seen.insert(record.label.clone()), "duplicate {}", record.label);
        }
    }

    /// Property: the priority partition comes first, each partition by
    /// descending confidence.
    #[test]
    fn prop_priority_partition_first(first in stream(), second in stream()) {
        let aggregator = DetectionAggregator::default();
        let result = aggregator.merge(first, second);
        let (priority, other) = result.set.records.split_at(result.set.priority_count);
        prop_assert!(priority.iter().all(|r| aggregator.is_priority(&r.label)));
        prop_assert!(other.iter().all(|r| !aggregator.is_priority(&r.label)));
        for partition in [priority, other] {
            for pair in partition.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
    }

    /// Property: each surviving label keeps the best confidence reported for it.
    #[test]
    fn prop_keeps_best_confidence(first in stream(), second in stream()) {
        let mut best: HashMap<String, f32> = HashMap::new();
        for record in first.iter().chain(&second) {
            let entry = best.entry(normalize_label(&record.label)).or_insert(0.0);
            *entry = entry.max(record.confidence);
        }
        let result = DetectionAggregator::default().merge(first, second);
        prop_assert_eq!(result.set.len(), best.len());
        for record in &result.set.records {
            prop_assert_eq!(Some(&record.confidence), best.get(&record.label));
        }
    }

    /// Property: merging a merged set with itself changes nothing.
    #[test]
    fn prop_merge_is_idempotent(first in stream(), second in stream()) {
        let aggregator = DetectionAggregator::default();
        let once = aggregator.merge(first, second);
        let twice = aggregator.merge(once.set.records.clone(), once.set.records.clone());
        prop_assert_eq!(&twice.set.records, &once.set.records);
        prop_assert_eq!(twice.set.priority_count, once.set.priority_count);
        prop_assert_eq!(twice.narration, once.narration);
    }

    /// Property: out-of-range confidences are dropped and counted, never kept.
    #[test]
    fn prop_invalid_confidence_dropped(valid in stream(), bad in prop::collection::vec(1.001_f32..10.0, 1..5)) {
        let invalid: Vec<DetectionRecord> = bad
            .iter()
            .map(|c| DetectionRecord::new("open", "ghost", *c))
            .collect();
        let result = DetectionAggregator::default().merge(valid, invalid.clone());
        prop_assert_eq!(result.set.dropped, invalid.len());
        prop_assert!(result.set.get("ghost").is_none());
    }
}

#[test]
fn test_guardian_and_learner_streams() {
    let general = vec![DetectionRecord::new("guardian", "person", 0.87)];
    let open = vec![
        DetectionRecord::new("learner", "person", 0.65),
        DetectionRecord::new("learner", "wallet", 0.75),
    ];
    let result = DetectionAggregator::default().merge(general, open);

    assert_eq!(result.set.labels(), vec!["person", "wallet"]);
    let person = result.set.get("person").unwrap();
    assert!((person.confidence - 0.87).abs() < f32::EPSILON);
    assert_eq!(person.source, "guardian");
    assert_eq!(result.narration.text(), "person and wallet");
}

#[test]
fn test_raw_detections_without_confidence_are_dropped() {
    let general: Vec<RawDetection> = serde_json::from_str(
        r#"[{"label": "Cups", "confidence": 0.6}, {"label": "chair"}, {"label": "", "confidence": 0.9}]"#,
    )
    .unwrap();
    let open: Vec<RawDetection> =
        serde_json::from_str(r#"[{"source": "yolo-world", "label": "cup", "confidence": 0.7}]"#)
            .unwrap();

    let result = DetectionAggregator::default().merge_raw(("general", general), ("open", open));
    assert_eq!(result.set.labels(), vec!["cup"]);
    assert_eq!(result.set.records[0].source, "yolo-world");
    assert_eq!(result.set.dropped, 2);
}

#[test]
fn test_no_detections_is_distinct_state() {
    let result = DetectionAggregator::default().merge(Vec::new(), Vec::new());
    assert!(result.set.is_empty());
    assert_eq!(result.narration, Narration::NoDetections);
    assert!(!result.narration.has_detections());
}

#[test]
fn test_custom_priority_labels() {
    let config = AggregatorConfig {
        priority_labels: vec!["Wallets".to_string()],
        narration_limit: 2,
    };
    let aggregator = DetectionAggregator::new(&config);
    let result = aggregator.merge(
        vec![
            DetectionRecord::new("general", "person", 0.9),
            DetectionRecord::new("general", "cup", 0.8),
        ],
        vec![DetectionRecord::new("open", "wallet", 0.1)],
    );
    assert_eq!(result.set.labels(), vec!["wallet", "person", "cup"]);
    assert_eq!(result.narration.text(), "wallet, person and 1 more");
}
