use super::{BoundingBox, Candidate};
use crate::backend::BOX_ATTRIBUTES;
use ndarray::ArrayView2;
use preprocess::Placement;

/// Turns the raw `(4 + classes) x candidates` output into scored candidates
/// in frame-pixel space.
pub struct Decoder {
    pub confidence_threshold: f32,
    best_score: Vec<f32>,
    best_class: Vec<u32>,
}

impl Decoder {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            best_score: Vec::new(),
            best_class: Vec::new(),
        }
    }

    /// Decode every candidate column whose best class score is strictly above
    /// the confidence threshold. Results are appended to `candidates` in
    /// ascending column order.
    #[tracing::instrument(level = "debug", skip_all, fields(columns = output.ncols()))]
    pub fn decode(
        &mut self,
        output: ArrayView2<f32>,
        placement: &Placement,
        candidates: &mut Vec<Candidate>,
    ) {
        let num_candidates = output.ncols();
        if output.nrows() <= BOX_ATTRIBUTES {
            return;
        }

        self.best_score.clear();
        self.best_score.resize(num_candidates, f32::NEG_INFINITY);
        self.best_class.clear();
        self.best_class.resize(num_candidates, 0);

        // Row-major pass over the class rows. Strict `>` keeps the lowest
        // class index when scores tie.
        for (class_id, row) in output.rows().into_iter().skip(BOX_ATTRIBUTES).enumerate() {
            for ((score, best), class) in row
                .iter()
                .zip(self.best_score.iter_mut())
                .zip(self.best_class.iter_mut())
            {
                if *score > *best {
                    *best = *score;
                    *class = class_id as u32;
                }
            }
        }

        for i in 0..num_candidates {
            let score = self.best_score[i];
            if !(score > self.confidence_threshold) {
                continue;
            }

            let cx = output[[0, i]];
            let cy = output[[1, i]];
            let w = output[[2, i]];
            let h = output[[3, i]];

            let left = placement.map_x(cx - w / 2.0);
            let top = placement.map_y(cy - h / 2.0);

            candidates.push(Candidate {
                bbox: BoundingBox {
                    left,
                    top,
                    width: w * placement.x_factor,
                    height: h * placement.y_factor,
                },
                class_id: self.best_class[i],
                score,
            });
        }
    }
}
