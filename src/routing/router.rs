//! Intent router.

use super::phrases::{Phrase, PhraseSet};
use super::similarity::phrase_similarity;
use super::{MatchMethod, Pipeline, RouterConfig, RoutingDecision};
use crate::models::{EventMeta, TelemetryEvent, Utterance};
use crate::observability::{TelemetrySink, noop_sink};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Maps utterances to exactly one pipeline.
///
/// Routing is synchronous, allocation-light and never fails: an utterance
/// that matches nothing is sent to [`Pipeline::Fast`].
pub struct IntentRouter {
    phrases: PhraseSet,
    threshold: f32,
    telemetry: Arc<dyn TelemetrySink>,
}

/// Best similarity match for one pipeline.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    pipeline: Pipeline,
    phrase: &'a Phrase,
    score: f32,
}

impl IntentRouter {
    /// Creates a router from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configured phrase lists are empty or overlap, or
    /// if the threshold is outside `[0, 1]`.
    pub fn new(config: &RouterConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&config.similarity_threshold) {
            return Err(crate::Error::InvalidInput(format!(
                "similarity threshold must be within [0, 1], got {}",
                config.similarity_threshold
            )));
        }
        Ok(Self {
            phrases: config.phrase_set()?,
            threshold: config.similarity_threshold,
            telemetry: noop_sink(),
        })
    }

    /// Creates a router with the built-in phrase lists and threshold.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            phrases: PhraseSet::defaults(),
            threshold: RouterConfig::DEFAULT_THRESHOLD,
            telemetry: noop_sink(),
        }
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the similarity threshold.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Returns the phrase lists.
    #[must_use]
    pub const fn phrases(&self) -> &PhraseSet {
        &self.phrases
    }

    /// Routes raw text.
    #[must_use]
    pub fn route(&self, text: &str) -> RoutingDecision {
        self.route_utterance(&Utterance::new(text))
    }

    /// Routes an utterance.
    #[must_use]
    #[instrument(
        skip(self, utterance),
        fields(pipeline = tracing::field::Empty, method = tracing::field::Empty)
    )]
    pub fn route_utterance(&self, utterance: &Utterance) -> RoutingDecision {
        let start = Instant::now();
        let (pipeline, method, phrase, score) = self.classify(utterance);
        let decision = RoutingDecision {
            pipeline,
            method,
            phrase,
            score,
            elapsed: start.elapsed(),
        };

        let span = tracing::Span::current();
        span.record("pipeline", pipeline.as_str());
        span.record("method", method.as_str());
        tracing::debug!(
            utterance = %utterance.normalized,
            phrase = ?decision.phrase,
            score = decision.score,
            elapsed_us = decision.elapsed.as_micros(),
            "Routed utterance"
        );
        metrics::counter!(
            "router_decisions_total",
            "pipeline" => pipeline.as_str(),
            "method" => method.as_str()
        )
        .increment(1);
        metrics::histogram!("router_latency_us").record(decision.elapsed.as_secs_f64() * 1e6);

        self.telemetry.emit(TelemetryEvent::RouteDecided {
            meta: EventMeta::new("router", None),
            pipeline,
            method,
            phrase: decision.phrase.clone(),
            score: decision.score,
            elapsed_us: u64::try_from(decision.elapsed.as_micros()).unwrap_or(u64::MAX),
        });

        decision
    }

    fn classify(&self, utterance: &Utterance) -> (Pipeline, MatchMethod, Option<String>, f32) {
        if utterance.is_empty() {
            return (Pipeline::Fast, MatchMethod::Default, None, 0.0);
        }

        if let Some((pipeline, phrase)) = self.phrase_match(&utterance.normalized) {
            return (pipeline, MatchMethod::Phrase, Some(phrase.text.clone()), 1.0);
        }

        match self.best_similarity(utterance) {
            Some(best) if best.score >= self.threshold => (
                best.pipeline,
                MatchMethod::Similarity,
                Some(best.phrase.text.clone()),
                best.score,
            ),
            Some(best) => (Pipeline::Fast, MatchMethod::Default, None, best.score),
            None => (Pipeline::Fast, MatchMethod::Default, None, 0.0),
        }
    }

    /// Phase 1: first phrase occurrence in precedence order.
    fn phrase_match(&self, normalized: &str) -> Option<(Pipeline, &Phrase)> {
        Pipeline::PRECEDENCE.into_iter().find_map(|pipeline| {
            self.phrases
                .for_pipeline(pipeline)
                .iter()
                .find(|phrase| phrase.occurs_in(normalized))
                .map(|phrase| (pipeline, phrase))
        })
    }

    /// Phase 2: per-pipeline maximum similarity, best pipeline overall.
    ///
    /// Ties keep the earlier pipeline in precedence order and the earlier
    /// phrase in declaration order.
    fn best_similarity(&self, utterance: &Utterance) -> Option<Candidate<'_>> {
        let tokens: Vec<&str> = utterance.tokens().collect();
        let mut best: Option<Candidate<'_>> = None;
        for pipeline in Pipeline::PRECEDENCE {
            for phrase in self.phrases.for_pipeline(pipeline) {
                let score = phrase_similarity(&tokens, phrase);
                if best.is_none_or(|b| score > b.score) {
                    best = Some(Candidate {
                        pipeline,
                        phrase,
                        score,
                    });
                }
            }
        }
        best
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
