use super::Candidate;

/// Greedy, class-agnostic non-maximum suppression.
///
/// Every surviving box suppresses all lower-scored boxes overlapping it with
/// IoU at or above `iou_threshold`, whatever their class.
pub struct Suppressor {
    pub iou_threshold: f32,
    pub score_threshold: f32,
}

impl Suppressor {
    pub fn new(iou_threshold: f32, score_threshold: f32) -> Self {
        Self {
            iou_threshold,
            score_threshold,
        }
    }

    /// Indices into `candidates` of the survivors, highest score first.
    /// Equal scores keep their input order.
    #[tracing::instrument(level = "debug", skip_all, fields(candidates = candidates.len()))]
    pub fn suppress(&self, candidates: &[Candidate]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].score > self.score_threshold)
            .collect();
        order.sort_by(|&a, &b| candidates[b].score.total_cmp(&candidates[a].score));

        let mut keep = Vec::new();
        let mut suppressed = vec![false; order.len()];

        for i in 0..order.len() {
            if suppressed[i] {
                continue;
            }
            let best = &candidates[order[i]].bbox;
            keep.push(order[i]);

            for j in (i + 1)..order.len() {
                if !suppressed[j] && best.iou(&candidates[order[j]].bbox) >= self.iou_threshold {
                    suppressed[j] = true;
                }
            }
        }

        keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::BoundingBox;

    fn candidate(left: f32, top: f32, size: f32, class_id: u32, score: f32) -> Candidate {
        Candidate {
            bbox: BoundingBox {
                left,
                top,
                width: size,
                height: size,
            },
            class_id,
            score,
        }
    }

    fn suppressor() -> Suppressor {
        Suppressor::new(0.45, 0.5)
    }

    #[test]
    fn test_overlapping_pair_collapses_to_higher_score() {
        // 100x100 boxes shifted by 10px on x: IoU = 9000 / 11000 ≈ 0.82
        let candidates = vec![candidate(10.0, 0.0, 100.0, 2, 0.6), candidate(0.0, 0.0, 100.0, 2, 0.9)];

        let keep = suppressor().suppress(&candidates);

        assert_eq!(keep, vec![1]);
    }

    #[test]
    fn test_low_overlap_pair_both_survive() {
        // Shifted by 60px: IoU = 4000 / 16000 = 0.25
        let candidates = vec![candidate(0.0, 0.0, 100.0, 0, 0.9), candidate(60.0, 0.0, 100.0, 0, 0.8)];

        let keep = suppressor().suppress(&candidates);

        assert_eq!(keep, vec![0, 1]);
    }

    #[test]
    fn test_iou_exactly_at_threshold_is_suppressed() {
        // Second box fully inside, area ratio 0.5 = IoU
        let a = candidate(0.0, 0.0, 100.0, 0, 0.9);
        let b = Candidate {
            bbox: BoundingBox {
                left: 0.0,
                top: 0.0,
                width: 100.0,
                height: 50.0,
            },
            class_id: 0,
            score: 0.8,
        };

        let keep = Suppressor::new(0.5, 0.5).suppress(&[a, b]);

        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn test_suppression_ignores_class() {
        let candidates = vec![candidate(0.0, 0.0, 100.0, 0, 0.9), candidate(5.0, 5.0, 100.0, 7, 0.85)];

        let keep = suppressor().suppress(&candidates);

        assert_eq!(keep, vec![0], "Different classes still suppress each other");
    }

    #[test]
    fn test_output_sorted_by_score_descending() {
        let candidates = vec![
            candidate(0.0, 0.0, 10.0, 0, 0.6),
            candidate(100.0, 0.0, 10.0, 0, 0.95),
            candidate(200.0, 0.0, 10.0, 0, 0.7),
            candidate(300.0, 0.0, 10.0, 0, 0.7),
        ];

        let keep = suppressor().suppress(&candidates);

        assert_eq!(keep, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_score_threshold_reapplied() {
        let candidates = vec![candidate(0.0, 0.0, 10.0, 0, 0.5), candidate(50.0, 0.0, 10.0, 0, 0.51)];

        let keep = suppressor().suppress(&candidates);

        assert_eq!(keep, vec![1]);
    }

    #[test]
    fn test_suppressor_is_idempotent() {
        let candidates = vec![
            candidate(0.0, 0.0, 100.0, 0, 0.9),
            candidate(10.0, 10.0, 100.0, 1, 0.8),
            candidate(300.0, 300.0, 50.0, 2, 0.7),
            candidate(310.0, 305.0, 50.0, 2, 0.65),
            candidate(600.0, 0.0, 20.0, 3, 0.55),
        ];
        let s = suppressor();

        let first: Vec<Candidate> = s
            .suppress(&candidates)
            .into_iter()
            .map(|i| candidates[i])
            .collect();
        let second: Vec<Candidate> = s.suppress(&first).into_iter().map(|i| first[i]).collect();

        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        assert!(suppressor().suppress(&[]).is_empty());
    }
}
