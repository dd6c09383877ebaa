//! Rotated square regions of interest for the landmark model.
//!
//! All coordinates are frame pixels. Rotation is clockwise in image space
//! (y down) and 0 means the fingers point straight up.

use std::f32::consts::{PI, TAU};

/// Palm box scale applied before cropping for the landmark model.
const PALM_SCALE: f32 = 2.6;
/// Palm box shift along the rotated y axis, as a fraction of box height.
const PALM_SHIFT_Y: f32 = -0.5;

/// Landmark box scale used when tracking into the next frame.
const LANDMARK_SCALE: f32 = 2.0;
const LANDMARK_SHIFT_Y: f32 = -0.1;

/// Landmarks used to derive a tracking ROI: wrist, thumb base, and the two
/// lowest joints of each finger.
const TRACKING_LANDMARKS: [usize; 12] = [0, 1, 2, 3, 5, 6, 9, 10, 13, 14, 17, 18];
const WRIST: usize = 0;
const MIDDLE_FINGER_MCP: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandRoi {
    pub center_x: f32,
    pub center_y: f32,
    /// Side length of the square.
    pub size: f32,
    pub rotation: f32,
}

impl HandRoi {
    /// ROI from a palm detection box `[x1, y1, x2, y2]` and its wrist and
    /// middle-finger keypoints.
    pub fn from_palm(bbox: [f32; 4], wrist: (f32, f32), middle_base: (f32, f32)) -> Self {
        let rotation = rotation_between(wrist, middle_base);
        let cx = (bbox[0] + bbox[2]) / 2.0;
        let cy = (bbox[1] + bbox[3]) / 2.0;
        let w = bbox[2] - bbox[0];
        let h = bbox[3] - bbox[1];
        transform(cx, cy, w, h, rotation, PALM_SCALE, PALM_SHIFT_Y)
    }

    /// ROI that should contain the same hand in the next frame, derived from
    /// its 21 landmark `(x, y)` positions. `None` when the points do not span
    /// a usable area.
    pub fn from_landmarks(points: &[(f32, f32)]) -> Option<Self> {
        if points.len() <= MIDDLE_FINGER_MCP {
            return None;
        }
        let rotation = rotation_between(points[WRIST], points[MIDDLE_FINGER_MCP]);
        let subset: Vec<(f32, f32)> = TRACKING_LANDMARKS
            .iter()
            .filter_map(|&i| points.get(i).copied())
            .collect();

        let (min_x, min_y, max_x, max_y) = bounds(subset.iter().copied());
        let axis_cx = (min_x + max_x) / 2.0;
        let axis_cy = (min_y + max_y) / 2.0;

        // Bounds in the hand's own frame, rotated about the axis-aligned center.
        let (sin, cos) = (-rotation).sin_cos();
        let rotated = subset.iter().map(|&(x, y)| {
            let (dx, dy) = (x - axis_cx, y - axis_cy);
            (dx * cos - dy * sin, dx * sin + dy * cos)
        });
        let (rmin_x, rmin_y, rmax_x, rmax_y) = bounds(rotated);

        let local_cx = (rmin_x + rmax_x) / 2.0;
        let local_cy = (rmin_y + rmax_y) / 2.0;
        let (sin, cos) = rotation.sin_cos();
        let cx = axis_cx + local_cx * cos - local_cy * sin;
        let cy = axis_cy + local_cx * sin + local_cy * cos;

        let roi = transform(
            cx,
            cy,
            rmax_x - rmin_x,
            rmax_y - rmin_y,
            rotation,
            LANDMARK_SCALE,
            LANDMARK_SHIFT_Y,
        );
        // Collapsed or non-finite landmarks cannot be cropped.
        (roi.size.is_finite() && roi.size > 0.0).then_some(roi)
    }

    /// Maps normalized ROI coordinates (`0..1` on both axes) to frame pixels.
    pub fn to_frame(&self, u: f32, v: f32) -> (f32, f32) {
        let (sin, cos) = self.rotation.sin_cos();
        let lx = (u - 0.5) * self.size;
        let ly = (v - 0.5) * self.size;
        (
            self.center_x + lx * cos - ly * sin,
            self.center_y + lx * sin + ly * cos,
        )
    }

    /// Inverse of [`HandRoi::to_frame`].
    pub fn from_frame(&self, x: f32, y: f32) -> (f32, f32) {
        let (sin, cos) = self.rotation.sin_cos();
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        let lx = dx * cos + dy * sin;
        let ly = -dx * sin + dy * cos;
        (lx / self.size + 0.5, ly / self.size + 0.5)
    }
}

/// Rotation that turns the `from -> to` vector to point straight up.
pub fn rotation_between(from: (f32, f32), to: (f32, f32)) -> f32 {
    let angle = PI / 2.0 - (-(to.1 - from.1)).atan2(to.0 - from.0);
    normalize_radians(angle)
}

/// Wraps an angle into `[-PI, PI)`.
pub fn normalize_radians(angle: f32) -> f32 {
    angle - TAU * ((angle + PI) / TAU).floor()
}

fn transform(
    cx: f32,
    cy: f32,
    width: f32,
    height: f32,
    rotation: f32,
    scale: f32,
    shift_y: f32,
) -> HandRoi {
    let (sin, cos) = rotation.sin_cos();
    let center_x = cx - height * shift_y * sin;
    let center_y = cy + height * shift_y * cos;
    HandRoi {
        center_x,
        center_y,
        size: width.max(height) * scale,
        rotation,
    }
}

fn bounds(points: impl Iterator<Item = (f32, f32)>) -> (f32, f32, f32, f32) {
    points.fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(min_x, min_y, max_x, max_y), (x, y)| {
            (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
        },
    )
}
