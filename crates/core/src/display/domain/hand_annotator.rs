//! Draws detected hands onto RGB frames for the preview window.

use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::shared::frame::Frame;
use crate::shared::landmark::{Hand, HAND_CONNECTIONS};

const SKELETON_COLOR: [u8; 3] = [255, 255, 255];
const LANDMARK_COLOR: [u8; 3] = [255, 0, 0];
const BBOX_COLOR: [u8; 3] = [255, 0, 255];

const LINE_THICKNESS: i32 = 2;
const LANDMARK_RADIUS: i32 = 4;
/// Padding between the landmark extent and the drawn box.
const BBOX_PADDING: i32 = 20;

type Canvas<'a> = ImageBuffer<Rgb<u8>, &'a mut [u8]>;

/// Draws skeleton, landmark dots, and a padded bounding box for every hand.
///
/// Anything outside the frame is clipped. Frames that are not 3-channel are
/// left as they are.
pub fn annotate_hands(frame: &mut Frame, hands: &[Hand]) {
    if hands.is_empty() || frame.channels() != 3 {
        return;
    }
    let (width, height) = (frame.width(), frame.height());
    let Some(mut canvas) = Canvas::from_raw(width, height, frame.data_mut()) else {
        log::warn!("Frame buffer does not match {width}x{height} RGB; skipping annotation");
        return;
    };

    for hand in hands {
        let lms = hand.landmarks();
        for &(a, b) in HAND_CONNECTIONS {
            let p = lms[a as usize];
            let q = lms[b as usize];
            thick_line(&mut canvas, (p.x, p.y), (q.x, q.y), Rgb(SKELETON_COLOR));
        }
        for lm in lms {
            draw_filled_circle_mut(&mut canvas, (lm.x, lm.y), LANDMARK_RADIUS, Rgb(LANDMARK_COLOR));
        }

        let bbox = hand.bbox();
        let left = bbox.x - BBOX_PADDING;
        let top = bbox.y - BBOX_PADDING;
        let right = bbox.x + bbox.width + BBOX_PADDING;
        let bottom = bbox.y + bbox.height + BBOX_PADDING;
        // Thickness grows inward from the outer edge.
        for inset in 0..LINE_THICKNESS {
            let w = right - left - 2 * inset + 1;
            let h = bottom - top - 2 * inset + 1;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(left + inset, top + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, Rgb(BBOX_COLOR));
        }
    }
}

/// One-pixel segments offset on both axes to reach `LINE_THICKNESS`.
fn thick_line(canvas: &mut Canvas<'_>, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    for oy in 0..LINE_THICKNESS {
        for ox in 0..LINE_THICKNESS {
            draw_line_segment_mut(
                canvas,
                ((from.0 + ox) as f32, (from.1 + oy) as f32),
                ((to.0 + ox) as f32, (to.1 + oy) as f32),
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::landmark::{Handedness, Landmark, NUM_LANDMARKS};

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let px = frame.as_ndarray();
        [px[[y, x, 0]], px[[y, x, 1]], px[[y, x, 2]]]
    }

    fn vertical_hand(x: i32, top: i32) -> Hand {
        let landmarks: [Landmark; NUM_LANDMARKS] =
            std::array::from_fn(|i| Landmark::new(x, top + i as i32 * 5, 0));
        Hand::new(landmarks, Handedness::Right, 0.9)
    }

    #[test]
    fn test_no_hands_leaves_frame_untouched() {
        let mut frame = Frame::blank(32, 32, 0);
        annotate_hands(&mut frame, &[]);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_landmarks_are_drawn_red() {
        let mut frame = Frame::blank(200, 200, 0);
        annotate_hands(&mut frame, &[vertical_hand(100, 40)]);
        assert_eq!(pixel(&frame, 100, 40), LANDMARK_COLOR);
        assert_eq!(pixel(&frame, 100, 140), LANDMARK_COLOR);
    }

    #[test]
    fn test_bbox_is_padded() {
        let mut frame = Frame::blank(200, 200, 0);
        annotate_hands(&mut frame, &[vertical_hand(100, 40)]);
        // Landmarks span y 40..=140 on x = 100; the box sits 20 px outside.
        assert_eq!(pixel(&frame, 80, 90), BBOX_COLOR);
        assert_eq!(pixel(&frame, 120, 90), BBOX_COLOR);
        assert_eq!(pixel(&frame, 100, 20), BBOX_COLOR);
        assert_eq!(pixel(&frame, 100, 160), BBOX_COLOR);
        assert_eq!(pixel(&frame, 60, 90), [0, 0, 0]);
    }

    #[test]
    fn test_skeleton_drawn_between_connected_landmarks() {
        let mut frame = Frame::blank(64, 64, 0);
        let mut landmarks = [Landmark::new(5, 5, 0); NUM_LANDMARKS];
        // Wrist -> thumb CMC is a connection
        landmarks[0] = Landmark::new(10, 32, 0);
        landmarks[1] = Landmark::new(50, 32, 0);
        let hand = Hand::new(landmarks, Handedness::Left, 0.9);
        annotate_hands(&mut frame, &[hand]);
        assert_eq!(pixel(&frame, 30, 32), SKELETON_COLOR);
    }

    #[test]
    fn test_drawing_is_clipped_at_edges() {
        let mut frame = Frame::blank(50, 50, 0);
        annotate_hands(&mut frame, &[vertical_hand(-30, -60), vertical_hand(48, 10)]);
        assert_eq!(frame.data().len(), 50 * 50 * 3);
    }

    #[test]
    fn test_thick_bbox_covers_inner_edge() {
        let mut frame = Frame::blank(200, 200, 0);
        annotate_hands(&mut frame, &[vertical_hand(100, 40)]);
        assert_eq!(pixel(&frame, 81, 90), BBOX_COLOR);
        assert_eq!(pixel(&frame, 119, 90), BBOX_COLOR);
        assert_eq!(pixel(&frame, 82, 90), [0, 0, 0]);
    }

    #[test]
    fn test_non_rgb_frame_is_left_alone() {
        let mut frame = Frame::new(vec![0u8; 16 * 16], 16, 16, 1, 0);
        annotate_hands(&mut frame, &[vertical_hand(8, 0)]);
        assert!(frame.data().iter().all(|&b| b == 0));
    }
}
