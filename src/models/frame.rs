//! Shared read-only camera frame.

use crate::current_timestamp_ms;
use std::sync::Arc;

/// An encoded camera frame.
///
/// The pixel payload is reference counted so both detectors and any
/// in-flight deep-analysis request can read the same bytes without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Encoded image bytes (JPEG/PNG as produced by the capture layer).
    pub data: Arc<[u8]>,
    /// MIME type of `data`.
    pub mime_type: &'static str,
    /// Capture time (Unix epoch milliseconds).
    pub captured_at: u64,
}

impl Frame {
    /// Creates a JPEG frame stamped with the current time.
    #[must_use]
    pub fn jpeg(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            mime_type: "image/jpeg",
            captured_at: current_timestamp_ms(),
        }
    }

    /// Creates an empty frame, used when a request carries no image.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Arc::from(Vec::new()),
            mime_type: "application/octet-stream",
            captured_at: current_timestamp_ms(),
        }
    }

    /// Returns whether the frame carries no pixel data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
