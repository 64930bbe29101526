//! Data models for sightline.
//!
//! Core records shared by the router, the tier executor, the aggregator and
//! the vocabulary manager.

mod detection;
mod events;
mod frame;
mod tier;
mod utterance;
mod vocabulary;

pub use detection::{BoundingBox, DetectionRecord, MergedDetectionSet, RawDetection};
pub use events::{EventMeta, TelemetryEvent};
pub use frame::Frame;
pub use tier::{AttemptOutcome, ExecutionAttempt, TierDescriptor, TierHealth};
pub use utterance::{Utterance, normalize_text};
pub use vocabulary::{VocabularyEntry, VocabularyOrigin, VocabularySnapshot};
