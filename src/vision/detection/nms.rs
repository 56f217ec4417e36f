// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-class greedy non-max suppression

use std::cmp::Ordering;

use super::DetectionBox;

/// Keep the highest-confidence box of every overlapping cluster
///
/// Boxes of different classes never suppress each other. The result is
/// ordered by descending confidence and holds at most `max_detections` boxes.
pub fn non_max_suppression(
    mut boxes: Vec<DetectionBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<DetectionBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<DetectionBox> = Vec::new();
    for candidate in boxes {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|kept| kept.class_id == candidate.class_id && kept.iou(&candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, class_id: usize, confidence: f32) -> DetectionBox {
        DetectionBox {
            xmin: x,
            ymin: 0.0,
            xmax: x + 10.0,
            ymax: 10.0,
            class_id,
            confidence,
        }
    }

    #[test]
    fn test_overlapping_same_class_keeps_best() {
        let boxes = vec![bbox(0.0, 1, 0.6), bbox(1.0, 1, 0.9)];
        let kept = non_max_suppression(boxes, 0.45, 100);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_overlapping_different_class_kept() {
        let boxes = vec![bbox(0.0, 0, 0.6), bbox(1.0, 1, 0.9)];
        let kept = non_max_suppression(boxes, 0.45, 100);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_disjoint_boxes_kept_in_confidence_order() {
        let boxes = vec![bbox(0.0, 1, 0.5), bbox(50.0, 1, 0.8), bbox(100.0, 1, 0.7)];
        let kept = non_max_suppression(boxes, 0.45, 100);
        let confidences: Vec<f32> = kept.iter().map(|b| b.confidence).collect();
        assert_eq!(confidences, vec![0.8, 0.7, 0.5]);
    }

    #[test]
    fn test_max_detections_cap() {
        let boxes = vec![bbox(0.0, 1, 0.5), bbox(50.0, 1, 0.8), bbox(100.0, 1, 0.7)];
        let kept = non_max_suppression(boxes, 0.45, 2);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(non_max_suppression(Vec::new(), 0.45, 10).is_empty());
    }
}
