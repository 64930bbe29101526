//! Detection records produced by the fast-path detectors.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the box area.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// One detected object from one detector in one perception cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Identifier of the detector that produced this record.
    pub source: String,
    /// Class label (normalized once it has passed through the aggregator).
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box, if the detector reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    /// Observation time (Unix epoch milliseconds).
    #[serde(default)]
    pub timestamp: u64,
}

impl DetectionRecord {
    /// Creates a record without a bounding box.
    #[must_use]
    pub fn new(source: impl Into<String>, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
            confidence,
            bbox: None,
            timestamp: 0,
        }
    }

    /// Sets the bounding box.
    #[must_use]
    pub const fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Sets the observation timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns whether the confidence is a finite number in `[0, 1]`.
    #[must_use]
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Wire form of a detection as reported by an external detector.
///
/// Confidence may be missing; such records are rejected by
/// [`RawDetection::into_record`] rather than defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Detector identifier.
    #[serde(default)]
    pub source: Option<String>,
    /// Class label.
    pub label: String,
    /// Confidence, possibly absent.
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Bounding box.
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    /// Observation time (Unix epoch milliseconds).
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl RawDetection {
    /// Converts into a [`DetectionRecord`], using `default_source` when the
    /// wire record carries none.
    ///
    /// Returns `None` when the confidence is missing.
    #[must_use]
    pub fn into_record(self, default_source: &str) -> Option<DetectionRecord> {
        let confidence = self.confidence?;
        Some(DetectionRecord {
            source: self.source.unwrap_or_else(|| default_source.to_string()),
            label: self.label,
            confidence,
            bbox: self.bbox,
            timestamp: self.timestamp.unwrap_or(0),
        })
    }
}

/// Deduplicated, priority-ordered detections for one perception cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MergedDetectionSet {
    /// Records, priority partition first, each partition by descending confidence.
    pub records: Vec<DetectionRecord>,
    /// Number of leading records that belong to the priority partition.
    pub priority_count: usize,
    /// Number of malformed input records dropped during the merge.
    pub dropped: usize,
}

impl MergedDetectionSet {
    /// Returns whether the set holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns the labels in emitted order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.label.as_str()).collect()
    }

    /// Returns the priority partition.
    #[must_use]
    pub fn priority(&self) -> &[DetectionRecord] {
        &self.records[..self.priority_count.min(self.records.len())]
    }

    /// Looks up a record by normalized label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&DetectionRecord> {
        self.records.iter().find(|r| r.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_validation() {
        assert!(DetectionRecord::new("a", "cup", 0.0).has_valid_confidence());
        assert!(DetectionRecord::new("a", "cup", 1.0).has_valid_confidence());
        assert!(!DetectionRecord::new("a", "cup", 1.01).has_valid_confidence());
        assert!(!DetectionRecord::new("a", "cup", -0.1).has_valid_confidence());
        assert!(!DetectionRecord::new("a", "cup", f32::NAN).has_valid_confidence());
    }

    #[test]
    fn test_raw_detection_missing_confidence() {
        let raw: RawDetection = serde_json::from_str(r#"{"label":"cup"}"#).unwrap();
        assert!(raw.into_record("guardian").is_none());

        let raw: RawDetection =
            serde_json::from_str(r#"{"label":"cup","confidence":0.4}"#).unwrap();
        let record = raw.into_record("guardian").unwrap();
        assert_eq!(record.source, "guardian");
        assert!((record.confidence - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_merged_set_priority_slice() {
        let set = MergedDetectionSet {
            records: vec![
                DetectionRecord::new("a", "person", 0.3),
                DetectionRecord::new("a", "cup", 0.9),
            ],
            priority_count: 1,
            dropped: 0,
        };
        assert_eq!(set.priority().len(), 1);
        assert_eq!(set.labels(), vec!["person", "cup"]);
        assert!(set.get("cup").is_some());
    }
}
