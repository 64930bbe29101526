//! Perception plumbing around the decision components.
//!
//! Detectors, cameras and NLP models live outside this crate. This module
//! defines the seams they plug into ([`Detector`], [`OpenVocabularyDetector`],
//! [`FrameSource`]), runs both detectors on one frame in parallel, and wires
//! router, aggregator, worker and vocabulary into the caller-facing
//! [`PerceptionPipeline`].

mod cycle;
mod detectors;
mod pipeline;

pub use cycle::{FrameSource, PerceptionLoop};
pub use detectors::{FixedDetector, PromptableDetector, detect_pair};
pub use pipeline::{Dispatch, PerceptionPipeline, PipelineReply};

use crate::Result;
use crate::models::{DetectionRecord, Frame};

/// An object detector.
pub trait Detector: Send + Sync {
    /// Detector identifier, used as the source tag of its records.
    fn id(&self) -> &str;

    /// Detects objects in `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn detect(&self, frame: &Frame) -> Result<Vec<DetectionRecord>>;
}

/// A detector prompted with a runtime label set.
pub trait OpenVocabularyDetector: Detector {
    /// Replaces the active label set.
    ///
    /// Must be idempotent: pushing the same set twice has the same effect
    /// as pushing it once, and detection keeps running throughout.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector rejects the update.
    fn set_active_vocabulary(&self, phrases: &[String]) -> Result<()>;
}
