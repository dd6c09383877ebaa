//! Numeric helpers shared by the ONNX hand models.

/// Raw scores are clipped before the sigmoid so extreme logits stay finite.
const SCORE_CLIP: f32 = 100.0;

pub fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-SCORE_CLIP, SCORE_CLIP);
    1.0 / (1.0 + (-x).exp())
}

/// Treats values already in `[0, 1]` as probabilities and squashes anything
/// else. Converted hand models disagree on whether they export logits.
pub fn as_probability(x: f32) -> f32 {
    if (0.0..=1.0).contains(&x) {
        x
    } else {
        sigmoid(x)
    }
}

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_zero() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_sigmoid_saturates() {
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_sigmoid_clips_extreme_logits() {
        assert!(sigmoid(-1e9).is_finite());
        assert_relative_eq!(sigmoid(1e9), 1.0);
    }

    #[test]
    fn test_as_probability_passes_through_unit_range() {
        assert_relative_eq!(as_probability(0.73), 0.73);
        assert_relative_eq!(as_probability(4.0), sigmoid(4.0));
        assert_relative_eq!(as_probability(-2.0), sigmoid(-2.0));
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&a, &a), 1.0);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        assert_relative_eq!(bbox_iou(&a, &b), 25.0 / 175.0, epsilon = 1e-6);
    }
}
