//! Fork-join detection and in-process detector doubles.

use super::{Detector, OpenVocabularyDetector};
use crate::aggregation::normalize_label;
use crate::models::{DetectionRecord, Frame};
use crate::{Error, Result, current_timestamp_ms};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// Runs both detectors on `frame` in parallel and waits for both.
///
/// A detector that fails or panics contributes an empty list; the failure is
/// logged and counted, never propagated.
pub fn detect_pair<A, B>(
    general: &A,
    open: &B,
    frame: &Frame,
) -> (Vec<DetectionRecord>, Vec<DetectionRecord>)
where
    A: Detector + ?Sized,
    B: Detector + ?Sized,
{
    std::thread::scope(|s| {
        let general_handle = s.spawn(|| general.detect(frame));
        let open_handle = s.spawn(|| open.detect(frame));
        (
            settle(general.id(), general_handle.join()),
            settle(open.id(), open_handle.join()),
        )
    })
}

fn settle(
    id: &str,
    joined: std::thread::Result<Result<Vec<DetectionRecord>>>,
) -> Vec<DetectionRecord> {
    match joined {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => {
            tracing::warn!(detector = id, error = %e, "Detector failed");
            metrics::counter!("detector_failures_total", "detector" => id.to_string()).increment(1);
            Vec::new()
        },
        Err(_) => {
            tracing::error!(detector = id, "Detector panicked");
            metrics::counter!("detector_failures_total", "detector" => id.to_string()).increment(1);
            Vec::new()
        },
    }
}

/// Detector double returning a configurable record list.
#[derive(Debug)]
pub struct FixedDetector {
    id: String,
    records: Mutex<Vec<DetectionRecord>>,
    failure: Option<String>,
}

impl FixedDetector {
    /// Creates a detector that reports `records` for every frame.
    #[must_use]
    pub fn new(id: impl Into<String>, records: Vec<DetectionRecord>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(records),
            failure: None,
        }
    }

    /// Creates a detector that fails on every frame.
    #[must_use]
    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    /// Replaces the reported records.
    pub fn set_records(&self, records: Vec<DetectionRecord>) {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records;
    }
}

impl Detector for FixedDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(&self, _frame: &Frame) -> Result<Vec<DetectionRecord>> {
        if let Some(message) = &self.failure {
            return Err(Error::OperationFailed {
                operation: format!("detect:{}", self.id),
                cause: message.clone(),
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Open-vocabulary detector double.
///
/// Holds a fixed "scene" of labelled objects and reports only those whose
/// normalized label is in the active vocabulary, the way a prompted
/// detector only finds what it was asked for.
#[derive(Debug)]
pub struct PromptableDetector {
    id: String,
    scene: Vec<(String, f32)>,
    vocabulary: RwLock<Vec<String>>,
    reconfigurations: AtomicUsize,
}

impl PromptableDetector {
    /// Creates a detector with an empty scene and vocabulary.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scene: Vec::new(),
            vocabulary: RwLock::new(Vec::new()),
            reconfigurations: AtomicUsize::new(0),
        }
    }

    /// Sets the objects present in every frame.
    #[must_use]
    pub fn with_scene<S: Into<String>>(mut self, scene: impl IntoIterator<Item = (S, f32)>) -> Self {
        self.scene = scene.into_iter().map(|(l, c)| (l.into(), c)).collect();
        self
    }

    /// Returns the active vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> Vec<String> {
        self.vocabulary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many times the vocabulary was pushed.
    #[must_use]
    pub fn reconfigurations(&self) -> usize {
        self.reconfigurations.load(Ordering::Relaxed)
    }
}

impl Detector for PromptableDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<DetectionRecord>> {
        let vocabulary = self.vocabulary.read().unwrap_or_else(PoisonError::into_inner);
        let prompted: HashSet<&str> = vocabulary.iter().map(String::as_str).collect();
        let timestamp = if frame.captured_at == 0 {
            current_timestamp_ms()
        } else {
            frame.captured_at
        };
        Ok(self
            .scene
            .iter()
            .filter(|(label, _)| prompted.contains(normalize_label(label).as_str()))
            .map(|(label, confidence)| {
                DetectionRecord::new(&self.id, label, *confidence).with_timestamp(timestamp)
            })
            .collect())
    }
}

impl OpenVocabularyDetector for PromptableDetector {
    fn set_active_vocabulary(&self, phrases: &[String]) -> Result<()> {
        let mut vocabulary = self.vocabulary.write().unwrap_or_else(PoisonError::into_inner);
        phrases.clone_into(&mut vocabulary);
        self.reconfigurations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
