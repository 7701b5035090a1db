//! Cross-window deduplication via greedy non-max suppression.
//!
//! The same object seen in several overlapping windows accumulates several
//! near-identical global boxes; greedy NMS keeps the highest-scoring one and
//! suppresses the rest.
//!
//! The suppression ratio is **intersection over the candidate's own area**
//! by default, not IoU. The asymmetry is deliberate and inherited: a small
//! box entirely inside a larger kept box has ratio 1 and is suppressed even
//! though its IoU with the kept box may be tiny. Do not "fix" this to IoU;
//! choose the metric explicitly through [`OverlapMetric`].
//!
//! The scan is O(n * k) after an O(n log n) sort, where k is the number of
//! comparisons per surviving detection; worst case O(n^2). Fine for the
//! expected hundreds-to-low-thousands of candidates per raster. Dense
//! detection sets would want a spatial index before the pairwise loop.

use serde::{Deserialize, Serialize};

use crate::types::Detection;

/// Overlap ratio used to decide suppression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMetric {
    /// Intersection divided by the suppressed candidate's own box area.
    /// Legacy semantics; the default.
    #[default]
    CandidateArea,
    /// Intersection over union.
    Iou,
}

impl OverlapMetric {
    fn ratio(&self, kept: &Detection, candidate: &Detection) -> f64 {
        let inter = kept.bbox.intersection_area(&candidate.bbox);
        if inter <= 0.0 {
            return 0.0;
        }
        match self {
            OverlapMetric::CandidateArea => inter / candidate.bbox.area(),
            OverlapMetric::Iou => inter / (kept.bbox.area() + candidate.bbox.area() - inter),
        }
    }
}

/// Greedy NMS over a full per-raster detection set.
///
/// Detections are visited in descending score order (stable on ties, so
/// equal scores keep their original relative order); each kept detection
/// suppresses every remaining one whose overlap ratio exceeds
/// `overlap_threshold`. The input is never mutated; an empty input yields an
/// empty output.
pub fn suppress(
    detections: &[Detection],
    overlap_threshold: f64,
    metric: OverlapMetric,
) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| detections[b].score.total_cmp(&detections[a].score));

    let mut alive = vec![true; detections.len()];
    let mut kept = Vec::new();

    for pos in 0..order.len() {
        let i = order[pos];
        if !alive[i] {
            continue;
        }
        alive[i] = false;
        kept.push(detections[i].clone());
        let winner = &detections[i];

        for &j in &order[pos + 1..] {
            if !alive[j] {
                continue;
            }
            if metric.ratio(winner, &detections[j]) > overlap_threshold {
                alive[j] = false;
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelBox;

    fn det(min_x: f64, min_y: f64, max_x: f64, max_y: f64, score: f32) -> Detection {
        Detection::new(PixelBox::new(min_x, min_y, max_x, max_y), 0, score)
    }

    #[test]
    fn identical_boxes_keep_only_the_best_score() {
        let input = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(0.0, 0.0, 100.0, 100.0, 0.5),
        ];
        let kept = suppress(&input, 0.3, OverlapMetric::CandidateArea);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn disjoint_boxes_never_suppress_each_other() {
        let input = vec![
            det(0.0, 0.0, 10.0, 10.0, 0.9),
            det(500.0, 500.0, 510.0, 510.0, 0.1),
        ];
        let kept = suppress(&input, 0.0, OverlapMetric::CandidateArea);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn suppression_is_idempotent() {
        let input = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(50.0, 50.0, 150.0, 150.0, 0.8),
            det(40.0, 40.0, 90.0, 90.0, 0.7),
            det(300.0, 300.0, 400.0, 400.0, 0.6),
        ];
        let once = suppress(&input, 0.3, OverlapMetric::CandidateArea);
        let twice = suppress(&once, 0.3, OverlapMetric::CandidateArea);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.bbox, b.bbox);
        }
    }

    #[test]
    fn candidate_area_suppresses_nested_box_where_iou_keeps_it() {
        // Small box fully inside a large kept box: intersection equals the
        // candidate's whole area, but IoU stays small.
        let input = vec![
            det(0.0, 0.0, 199.0, 199.0, 0.9),
            det(10.0, 10.0, 19.0, 19.0, 0.5),
        ];
        let by_candidate = suppress(&input, 0.5, OverlapMetric::CandidateArea);
        assert_eq!(by_candidate.len(), 1);

        let by_iou = suppress(&input, 0.5, OverlapMetric::Iou);
        assert_eq!(by_iou.len(), 2);
    }

    #[test]
    fn score_ties_are_stable_in_input_order() {
        let first = det(0.0, 0.0, 100.0, 100.0, 0.7);
        let second = det(0.0, 0.0, 100.0, 100.0, 0.7);
        let kept = suppress(&[first.clone(), second], 0.3, OverlapMetric::CandidateArea);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bbox, first.bbox);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(suppress(&[], 0.5, OverlapMetric::CandidateArea).is_empty());
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.5),
            det(0.0, 0.0, 100.0, 100.0, 0.9),
        ];
        let before: Vec<f32> = input.iter().map(|d| d.score).collect();
        let _ = suppress(&input, 0.3, OverlapMetric::CandidateArea);
        let after: Vec<f32> = input.iter().map(|d| d.score).collect();
        assert_eq!(before, after);
    }
}
