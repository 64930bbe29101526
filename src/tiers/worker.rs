//! Background deep-analysis worker.
//!
//! Runs deep-analysis requests on tokio tasks so the caller's command path
//! never blocks on a backend. Submitting a new request supersedes the one in
//! flight; the older result is reported as [`WorkerEvent::Superseded`] and
//! never as a completion.

use super::{CancelToken, CascadingExecutor, DeepAnalysisResponse, TierRequest};
use crate::models::{Frame, VocabularyOrigin};
use crate::vocabulary::VocabularyManager;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Identifier of a submitted deep-analysis job.
pub type JobId = u64;

/// Lifecycle notifications from the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The job began executing.
    Started {
        /// Job identifier.
        job_id: JobId,
        /// The user's question.
        query: String,
    },
    /// The job produced a response.
    Completed {
        /// Job identifier.
        job_id: JobId,
        /// The response.
        response: DeepAnalysisResponse,
        /// Phrases the vocabulary learned from the response.
        learned: Vec<String>,
    },
    /// Every tier failed.
    Failed {
        /// Job identifier.
        job_id: JobId,
        /// Failure description.
        error: String,
    },
    /// A newer job replaced this one before it finished.
    Superseded {
        /// Job identifier.
        job_id: JobId,
    },
}

impl WorkerEvent {
    /// Returns the job this event belongs to.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::Started { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Superseded { job_id } => *job_id,
        }
    }
}

type InFlight = Arc<Mutex<Option<(JobId, CancelToken)>>>;

/// Runs at most one deep-analysis job at a time.
pub struct DeepAnalysisWorker {
    executor: Arc<CascadingExecutor>,
    vocabulary: Option<Arc<VocabularyManager>>,
    runtime: Handle,
    events: mpsc::UnboundedSender<WorkerEvent>,
    in_flight: InFlight,
    next_id: AtomicU64,
    shutdown: CancelToken,
}

impl DeepAnalysisWorker {
    /// Creates a worker bound to the current tokio runtime.
    ///
    /// Completed response text is fed to `vocabulary` when one is given.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn spawn(
        executor: Arc<CascadingExecutor>,
        vocabulary: Option<Arc<VocabularyManager>>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WorkerEvent>)> {
        let runtime = Handle::try_current().map_err(|e| Error::OperationFailed {
            operation: "spawn_deep_analysis_worker".to_string(),
            cause: e.to_string(),
        })?;
        let (events, receiver) = mpsc::unbounded_channel();
        Ok((
            Self {
                executor,
                vocabulary,
                runtime,
                events,
                in_flight: Arc::new(Mutex::new(None)),
                next_id: AtomicU64::new(1),
                shutdown: CancelToken::new(),
            },
            receiver,
        ))
    }

    /// Queues a deep-analysis request, superseding any job in flight.
    ///
    /// # Errors
    ///
    /// Returns an error after [`Self::shutdown`].
    pub fn submit(&self, query: impl Into<String>, frame: Frame) -> Result<JobId> {
        if self.shutdown.is_cancelled() {
            return Err(Error::OperationFailed {
                operation: "submit_deep_analysis".to_string(),
                cause: "worker is shut down".to_string(),
            });
        }

        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancelToken::new();
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((previous, previous_token)) = in_flight.replace((job_id, token.clone())) {
                tracing::debug!(
                    job_id = previous,
                    superseded_by = job_id,
                    "Superseding deep analysis"
                );
                previous_token.cancel();
            }
        }

        let request = TierRequest::new(query, frame);
        let job = Job {
            job_id,
            executor: Arc::clone(&self.executor),
            vocabulary: self.vocabulary.clone(),
            events: self.events.clone(),
            in_flight: Arc::clone(&self.in_flight),
            token,
        };
        self.runtime.spawn(job.run(request));
        metrics::counter!("worker_jobs_submitted_total").increment(1);
        Ok(job_id)
    }

    /// Returns the identifier of the job in flight, if any.
    #[must_use]
    pub fn in_flight(&self) -> Option<JobId> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(job_id, _)| *job_id)
    }

    /// Cancels the job in flight and refuses further submissions.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some((job_id, token)) = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::debug!(job_id, "Cancelling deep analysis on shutdown");
            token.cancel();
        }
    }
}

struct Job {
    job_id: JobId,
    executor: Arc<CascadingExecutor>,
    vocabulary: Option<Arc<VocabularyManager>>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    in_flight: InFlight,
    token: CancelToken,
}

impl Job {
    async fn run(self, request: TierRequest) {
        let job_id = self.job_id;
        self.send(WorkerEvent::Started {
            job_id,
            query: request.query.clone(),
        });

        let event = match self.executor.execute_cancellable(request, &self.token).await {
            // A completion that raced with supersession is discarded.
            Ok(_) if self.token.is_cancelled() => WorkerEvent::Superseded { job_id },
            Ok(response) => {
                let learned = self.learn(&response.text).await;
                WorkerEvent::Completed {
                    job_id,
                    response,
                    learned,
                }
            },
            Err(Error::Cancelled(_)) => WorkerEvent::Superseded { job_id },
            Err(err) => WorkerEvent::Failed {
                job_id,
                error: err.to_string(),
            },
        };

        let status = match &event {
            WorkerEvent::Completed { .. } => "completed",
            WorkerEvent::Superseded { .. } => "superseded",
            _ => "failed",
        };
        metrics::counter!("worker_jobs_total", "status" => status).increment(1);

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight.as_ref().is_some_and(|(current, _)| *current == job_id) {
                in_flight.take();
            }
        }
        self.send(event);
    }

    async fn learn(&self, text: &str) -> Vec<String> {
        let Some(vocabulary) = self.vocabulary.clone() else {
            return Vec::new();
        };
        let text = text.to_string();
        match tokio::task::spawn_blocking(move || {
            vocabulary.ingest(&text, VocabularyOrigin::DeepAnalysis)
        })
        .await
        {
            Ok(learned) => learned,
            Err(e) => {
                tracing::warn!(job_id = self.job_id, error = %e, "Vocabulary ingestion task failed");
                Vec::new()
            },
        }
    }

    fn send(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(job_id = self.job_id, "Worker event receiver dropped");
        }
    }
}
