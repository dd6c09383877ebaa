//! Hand landmark types shared by detection, packet encoding, and annotation.

/// Number of keypoints in one hand.
pub const NUM_LANDMARKS: usize = 21;

/// One hand keypoint in frame pixels.
///
/// `z` is depth relative to the wrist, in roughly the same scale as `x`;
/// negative values are closer to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Landmark {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Landmark {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for Landmark {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn flipped(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

/// Axis-aligned pixel box: `(x, y)` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// A detected hand: 21 landmarks in canonical order plus detector metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    landmarks: [Landmark; NUM_LANDMARKS],
    handedness: Handedness,
    score: f32,
}

impl Hand {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS], handedness: Handedness, score: f32) -> Self {
        Self {
            landmarks,
            handedness,
            score,
        }
    }

    pub fn landmarks(&self) -> &[Landmark; NUM_LANDMARKS] {
        &self.landmarks
    }

    pub fn landmark(&self, idx: LandmarkIdx) -> Landmark {
        self.landmarks[idx as usize]
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    /// Presence confidence reported by the landmark model, 0.0 to 1.0.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Tight box around the landmarks' `(x, y)` positions.
    pub fn bbox(&self) -> BoundingBox {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for lm in &self.landmarks {
            min_x = min_x.min(lm.x);
            min_y = min_y.min(lm.y);
            max_x = max_x.max(lm.x);
            max_y = max_y.max(lm.y);
        }
        BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        self.bbox().center()
    }
}

/// Names for the hand landmarks, in model output order.
///
/// MCP, PIP and DIP are the knuckle joints from the palm outwards; CMC and IP
/// are the thumb's base and middle joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Skeleton edges drawn between landmarks.
pub const HAND_CONNECTIONS: &[(LandmarkIdx, LandmarkIdx)] = {
    use LandmarkIdx::*;
    &[
        // Palm
        (Wrist, ThumbCmc),
        (Wrist, IndexFingerMcp),
        (IndexFingerMcp, MiddleFingerMcp),
        (MiddleFingerMcp, RingFingerMcp),
        (RingFingerMcp, PinkyMcp),
        (PinkyMcp, Wrist),
        // Thumb
        (ThumbCmc, ThumbMcp),
        (ThumbMcp, ThumbIp),
        (ThumbIp, ThumbTip),
        // Index
        (IndexFingerMcp, IndexFingerPip),
        (IndexFingerPip, IndexFingerDip),
        (IndexFingerDip, IndexFingerTip),
        // Middle
        (MiddleFingerMcp, MiddleFingerPip),
        (MiddleFingerPip, MiddleFingerDip),
        (MiddleFingerDip, MiddleFingerTip),
        // Ring
        (RingFingerMcp, RingFingerPip),
        (RingFingerPip, RingFingerDip),
        (RingFingerDip, RingFingerTip),
        // Pinky
        (PinkyMcp, PinkyPip),
        (PinkyPip, PinkyDip),
        (PinkyDip, PinkyTip),
    ]
};
