//! Benchmarks for the request-path hot spots.
//!
//! Benchmark targets:
//! - Intent routing: <5ms per utterance, phrase or similarity path
//! - Detection merge: well under one perception cycle

// Criterion macros generate items without docs - this is expected for benchmarks
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use sightline::aggregation::DetectionAggregator;
use sightline::models::DetectionRecord;
use sightline::routing::IntentRouter;

// ============================================================================
// Intent routing
// ============================================================================

const PHRASE_HIT: &str = "explain what you see in front of me";
const SIMILARITY_HIT: &str = "descrbe the room plese";
const NO_MATCH: &str =
    "could you play the next song from the playlist my sister shared yesterday evening";

fn bench_routing(c: &mut Criterion) {
    let router = IntentRouter::with_defaults();
    let mut group = c.benchmark_group("intent_routing");
    group.measurement_time(Duration::from_secs(5));

    for (name, text) in [
        ("phrase", PHRASE_HIT),
        ("similarity", SIMILARITY_HIT),
        ("default", NO_MATCH),
    ] {
        group.bench_with_input(BenchmarkId::new("path", name), &text, |b, text| {
            b.iter(|| router.route(black_box(text)));
        });
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("throughput", |b| {
        b.iter(|| {
            let _ = router.route(black_box(NO_MATCH));
        });
    });

    group.finish();
}

// ============================================================================
// Detection merge
// ============================================================================

fn detections(source: &str, count: usize) -> Vec<DetectionRecord> {
    const LABELS: &[&str] = &[
        "person", "cups", "chair", "dog", "bottles", "door", "bench", "car", "bicycle", "sign",
    ];
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let confidence = ((i * 37) % 100) as f32 / 100.0;
            DetectionRecord::new(source, LABELS[i % LABELS.len()], confidence)
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let aggregator = DetectionAggregator::default();
    let mut group = c.benchmark_group("detection_merge");

    for size in [4_usize, 32, 128] {
        let general = detections("general", size);
        let open = detections("open", size);
        group.bench_with_input(BenchmarkId::new("records", size), &size, |b, _| {
            b.iter(|| aggregator.merge(black_box(general.clone()), black_box(open.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_routing, bench_merge);

criterion_main!(benches);
