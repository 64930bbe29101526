//! Caller-facing pipeline facade.

use super::{Detector, OpenVocabularyDetector, detect_pair};
use crate::aggregation::{AggregationResult, DetectionAggregator};
use crate::models::{Frame, Utterance};
use crate::routing::{IntentRouter, Pipeline, RoutingDecision};
use crate::tiers::{DeepAnalysisWorker, JobId};
use crate::Result;
use std::sync::Arc;

/// What the pipeline did with a request.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Fast detection ran; the result is ready to announce.
    Detections(AggregationResult),
    /// Navigation was requested; the detections are handed to the
    /// navigation subsystem as obstacle context.
    Navigation(AggregationResult),
    /// Deep analysis was queued; its outcome arrives as a worker event.
    DeepAnalysisQueued {
        /// Worker job identifier.
        job_id: JobId,
    },
}

/// Routing decision plus dispatch outcome.
#[derive(Debug, Clone)]
pub struct PipelineReply {
    /// How the request was routed.
    pub decision: RoutingDecision,
    /// What happened next.
    pub dispatch: Dispatch,
}

/// Routes each request and dispatches it to the matching pipeline.
///
/// Fast detection and navigation run synchronously on the caller's thread
/// (both detectors in parallel); deep analysis is handed to the
/// [`DeepAnalysisWorker`] and never blocks the caller.
pub struct PerceptionPipeline {
    router: IntentRouter,
    aggregator: Arc<DetectionAggregator>,
    general: Arc<dyn Detector>,
    open: Arc<dyn OpenVocabularyDetector>,
    worker: Arc<DeepAnalysisWorker>,
}

impl PerceptionPipeline {
    /// Assembles a pipeline.
    #[must_use]
    pub fn new(
        router: IntentRouter,
        aggregator: Arc<DetectionAggregator>,
        general: Arc<dyn Detector>,
        open: Arc<dyn OpenVocabularyDetector>,
        worker: Arc<DeepAnalysisWorker>,
    ) -> Self {
        Self {
            router,
            aggregator,
            general,
            open,
            worker,
        }
    }

    /// Handles one utterance about `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error only if a deep-analysis job cannot be queued.
    pub fn handle(&self, text: &str, frame: Frame) -> Result<PipelineReply> {
        let utterance = Utterance::new(text);
        let decision = self.router.route_utterance(&utterance);
        let dispatch = match decision.pipeline {
            Pipeline::Fast => Dispatch::Detections(self.observe(&frame)),
            Pipeline::Navigation => Dispatch::Navigation(self.observe(&frame)),
            Pipeline::Deep => Dispatch::DeepAnalysisQueued {
                job_id: self.worker.submit(utterance.raw, frame)?,
            },
        };
        Ok(PipelineReply { decision, dispatch })
    }

    /// Runs both detectors on `frame` and merges their output.
    #[must_use]
    pub fn observe(&self, frame: &Frame) -> AggregationResult {
        let (general, open) = detect_pair(self.general.as_ref(), self.open.as_ref(), frame);
        self.aggregator.merge(general, open)
    }

    /// Returns the router.
    #[must_use]
    pub const fn router(&self) -> &IntentRouter {
        &self.router
    }

    /// Returns the deep-analysis worker.
    #[must_use]
    pub const fn worker(&self) -> &Arc<DeepAnalysisWorker> {
        &self.worker
    }
}
