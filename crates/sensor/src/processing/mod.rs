pub mod decode;
pub mod nms;

pub use decode::Decoder;
pub use nms::Suppressor;

use crate::backend::OutputTensor;
use crate::event::Detection;
use preprocess::Placement;

/// Axis-aligned box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.left.max(other.left);
        let y1 = self.top.max(other.top);
        let x2 = (self.left + self.width).min(other.left + other.width);
        let y2 = (self.top + self.height).min(other.top + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Pre-suppression proposal decoded from one output column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub score: f32,
}

/// Decoder followed by the suppressor, reusing its candidate buffer across
/// frames.
pub struct PostProcessor {
    decoder: Decoder,
    suppressor: Suppressor,
    candidates: Vec<Candidate>,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            decoder: Decoder::new(confidence_threshold),
            suppressor: Suppressor::new(iou_threshold, confidence_threshold),
            candidates: Vec::new(),
        }
    }

    /// Final detections for one frame, highest score first.
    pub fn process(
        &mut self,
        output: &OutputTensor,
        placement: &Placement,
        frame_size: (u32, u32),
    ) -> Vec<Detection> {
        self.candidates.clear();
        self.decoder
            .decode(output.view(), placement, &mut self.candidates);

        if self.candidates.is_empty() {
            return Vec::new();
        }

        self.suppressor
            .suppress(&self.candidates)
            .into_iter()
            .map(|i| Detection::from_candidate(&self.candidates[i], frame_size))
            .collect()
    }

    /// Candidates from the last [`process`](Self::process) call, before
    /// suppression.
    pub fn last_candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}
