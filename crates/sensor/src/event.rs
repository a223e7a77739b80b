use crate::processing::Candidate;
use serde::{Deserialize, Serialize};

/// Post-suppression observation, centroid in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "c")]
    pub class_id: u32,
    #[serde(rename = "s")]
    pub score: f32,
    pub x: u32,
    pub y: u32,
}

impl Detection {
    /// Integer centroid of the candidate box, clipped to
    /// `[0, width) x [0, height)`.
    ///
    /// Box origin and extent are truncated to whole pixels first, so the
    /// centroid is `left + width / 2` in integer arithmetic.
    pub fn from_candidate(candidate: &Candidate, frame_size: (u32, u32)) -> Self {
        let bbox = &candidate.bbox;
        Self {
            class_id: candidate.class_id,
            score: candidate.score,
            x: clip(pixel_center(bbox.left, bbox.width), frame_size.0),
            y: clip(pixel_center(bbox.top, bbox.height), frame_size.1),
        }
    }
}

#[inline]
fn pixel_center(start: f32, extent: f32) -> i64 {
    // `as` truncates toward zero and saturates on overflow or NaN
    start as i64 + (extent as i64) / 2
}

#[inline]
fn clip(value: i64, extent: u32) -> u32 {
    value.clamp(0, i64::from(extent.saturating_sub(1))) as u32
}

/// Wire payload: `{"t": <epoch ms>, "objs": [{"c", "s", "x", "y"}, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "objs")]
    pub objects: Vec<Detection>,
}

impl DetectionEvent {
    /// `None` when nothing survived suppression; empty events are never sent.
    pub fn build(detections: Vec<Detection>, timestamp_ms: i64) -> Option<Self> {
        if detections.is_empty() {
            return None;
        }
        Some(Self {
            timestamp_ms,
            objects: detections,
        })
    }

    pub fn to_payload(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
