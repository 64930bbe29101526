//! End-to-end flow: route, detect, analyze, learn, detect again.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use sightline::aggregation::DetectionAggregator;
use sightline::models::{DetectionRecord, Frame, TelemetryEvent, VocabularyOrigin};
use sightline::observability::EventBus;
use sightline::perception::{
    Dispatch, FixedDetector, FrameSource, PerceptionLoop, PerceptionPipeline, PromptableDetector,
};
use sightline::routing::{IntentRouter, Pipeline};
use sightline::tiers::{
    CascadingExecutor, DeepAnalysisWorker, ExecutorConfig, FixedResponseBackend, TierBackend,
    WorkerEvent,
};
use sightline::vocabulary::{
    HeuristicPhraseExtractor, MemoryVocabularyStore, VocabularyConfig, VocabularyManager,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

const ANSWER: &str = "There is a red door to your left, and a wooden bench near the window.";

struct Rig {
    pipeline: PerceptionPipeline,
    events: UnboundedReceiver<WorkerEvent>,
    open: Arc<PromptableDetector>,
    vocabulary: Arc<VocabularyManager>,
    bus: Arc<EventBus>,
}

fn rig() -> Rig {
    let bus = Arc::new(EventBus::new(64));
    let open = Arc::new(
        PromptableDetector::new("open").with_scene([("red door", 0.55), ("wooden bench", 0.4)]),
    );
    let vocabulary = Arc::new(
        VocabularyManager::open(
            &VocabularyConfig {
                capacity: 16,
                ..VocabularyConfig::default()
            },
            Arc::new(MemoryVocabularyStore::new()),
            Arc::new(HeuristicPhraseExtractor::default()),
        )
        .unwrap()
        .with_detector(open.clone())
        .with_telemetry(bus.clone()),
    );

    let backends: Vec<Arc<dyn TierBackend>> = vec![Arc::new(FixedResponseBackend::new("local", ANSWER))];
    let executor = Arc::new(
        CascadingExecutor::from_backends(backends, ExecutorConfig::default())
            .unwrap()
            .with_telemetry(bus.clone()),
    );
    let (worker, events) = DeepAnalysisWorker::spawn(executor, Some(Arc::clone(&vocabulary))).unwrap();

    let general = Arc::new(FixedDetector::new(
        "general",
        vec![
            DetectionRecord::new("general", "person", 0.35),
            DetectionRecord::new("general", "chairs", 0.9),
        ],
    ));
    let pipeline = PerceptionPipeline::new(
        IntentRouter::with_defaults().with_telemetry(bus.clone()),
        Arc::new(DetectionAggregator::default().with_telemetry(bus.clone())),
        general,
        open.clone(),
        Arc::new(worker),
    );

    Rig {
        pipeline,
        events,
        open,
        vocabulary,
        bus,
    }
}

async fn wait_for_completion(events: &mut UnboundedReceiver<WorkerEvent>) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            if !matches!(event, WorkerEvent::Started { .. }) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_deep_analysis_grows_open_vocabulary() {
    let mut rig = rig();

    // Before learning, only the general detector contributes.
    let reply = rig.pipeline.handle("what do you see", Frame::empty()).unwrap();
    assert_eq!(reply.decision.pipeline, Pipeline::Fast);
    let Dispatch::Detections(before) = reply.dispatch else {
        panic!("expected detections");
    };
    assert_eq!(before.set.labels(), vec!["person", "chair"]);

    let reply = rig
        .pipeline
        .handle("explain what you see", Frame::empty())
        .unwrap();
    let Dispatch::DeepAnalysisQueued { job_id } = reply.dispatch else {
        panic!("expected a queued job");
    };
    let WorkerEvent::Completed {
        job_id: done,
        response,
        learned,
    } = wait_for_completion(&mut rig.events).await
    else {
        panic!("expected completion");
    };
    assert_eq!(done, job_id);
    assert_eq!(response.tier_name, "local");
    assert_eq!(learned, vec!["red door", "wooden bench", "window"]);
    assert_eq!(rig.open.reconfigurations(), 2);

    // The open-vocabulary detector now finds the learned objects.
    let after = rig.pipeline.observe(&Frame::empty());
    assert_eq!(
        after.set.labels(),
        vec!["person", "chair", "red door", "wooden bench"]
    );
    assert_eq!(
        after.narration.text(),
        "person, chair, red door and wooden bench"
    );
    assert_eq!(after.set.get("red door").unwrap().source, "open");
}

#[tokio::test]
async fn test_navigation_gets_obstacle_context() {
    let rig = rig();
    let reply = rig
        .pipeline
        .handle("guide me to the exit", Frame::empty())
        .unwrap();
    let Dispatch::Navigation(context) = reply.dispatch else {
        panic!("expected navigation");
    };
    assert_eq!(context.set.priority_count, 1);
    assert_eq!(context.set.priority()[0].label, "person");
}

#[tokio::test]
async fn test_telemetry_reaches_the_bus() {
    let rig = rig();
    let mut routes = rig.bus.subscribe_event_type("route.decided");
    let mut learned = rig.bus.subscribe_event_type("vocabulary.learned");

    rig.pipeline.handle("scan", Frame::empty()).unwrap();
    rig.vocabulary
        .ingest_list(&["ticket machine"], VocabularyOrigin::PointOfInterest);

    let route = routes.recv().await.unwrap();
    assert!(matches!(
        route,
        TelemetryEvent::RouteDecided {
            pipeline: Pipeline::Fast,
            ..
        }
    ));
    let TelemetryEvent::VocabularyLearned { added, origin, .. } = learned.recv().await.unwrap() else {
        panic!("expected a learned event");
    };
    assert_eq!(added, vec!["ticket machine"]);
    assert_eq!(origin, VocabularyOrigin::PointOfInterest);
}

#[tokio::test]
async fn test_newer_request_supersedes_older() {
    let mut rig = rig();
    let first = rig.pipeline.worker().submit("describe the scene", Frame::empty()).unwrap();
    let second = rig.pipeline.worker().submit("read the text", Frame::empty()).unwrap();
    assert!(second > first);

    let mut finished = Vec::new();
    while finished.len() < 2 {
        finished.push(wait_for_completion(&mut rig.events).await);
    }
    let completed: Vec<_> = finished
        .iter()
        .filter(|e| matches!(e, WorkerEvent::Completed { .. }))
        .map(WorkerEvent::job_id)
        .collect();
    // The newest job always completes; the older one may have finished
    // before it was superseded.
    assert!(completed.contains(&second));
}

struct CountingCamera {
    frames: AtomicU64,
}

impl FrameSource for CountingCamera {
    fn next_frame(&self) -> sightline::Result<Option<Frame>> {
        let n = self.frames.fetch_add(1, Ordering::SeqCst);
        let mut frame = Frame::jpeg(640, 480, vec![0xFF, 0xD8, 0xFF]);
        frame.captured_at = n + 1;
        Ok(Some(frame))
    }
}

#[tokio::test]
async fn test_perception_loop_publishes_merged_results() {
    let camera = Arc::new(CountingCamera {
        frames: AtomicU64::new(0),
    });
    let general = Arc::new(FixedDetector::new(
        "general",
        vec![DetectionRecord::new("general", "dog", 0.7)],
    ));
    let open = Arc::new(PromptableDetector::new("open").with_scene([("kiosk", 0.8)]));
    let perception = PerceptionLoop::start(
        camera.clone(),
        general,
        open,
        Arc::new(DetectionAggregator::default()),
        Duration::from_millis(5),
    );

    let mut updates = perception.subscribe();
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(Option::is_some))
        .await
        .unwrap()
        .unwrap();
    let latest = perception.latest().unwrap();
    assert_eq!(latest.set.labels(), vec!["dog"]);

    perception.stop().await;
    assert!(camera.frames.load(Ordering::SeqCst) >= 1);
}
