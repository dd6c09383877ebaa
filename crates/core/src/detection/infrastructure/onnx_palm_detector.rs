/// Palm detector using ONNX Runtime via `ort`.
///
/// Single-shot anchor detector that finds palms (not whole hands) and two
/// keypoints per palm used to orient the landmark crop.
use std::path::Path;

use crate::shared::frame::Frame;

use super::execution_provider::load_session;
use super::math::{bbox_iou, sigmoid};

/// Palm model input resolution.
const INPUT_SIZE: u32 = 192;

/// Number of anchors for the 192x192 palm model.
const NUM_ANCHORS: usize = 2016;

/// Values per anchor: box (cx, cy, w, h) + 7 keypoints × (x, y).
const NUM_REGRESSORS: usize = 18;
const NUM_KEYPOINTS: usize = 7;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.3;

/// Keypoint indices used for ROI rotation.
pub const WRIST_KEYPOINT: usize = 0;
pub const MIDDLE_FINGER_KEYPOINT: usize = 2;

/// A detected palm in frame pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct PalmDetection {
    /// `[x1, y1, x2, y2]`.
    pub bbox: [f32; 4],
    pub keypoints: [(f32, f32); NUM_KEYPOINTS],
    pub score: f32,
}

impl PalmDetection {
    pub fn wrist(&self) -> (f32, f32) {
        self.keypoints[WRIST_KEYPOINT]
    }

    pub fn middle_finger_base(&self) -> (f32, f32) {
        self.keypoints[MIDDLE_FINGER_KEYPOINT]
    }
}

/// Palm detector backed by an ONNX Runtime session.
pub struct OnnxPalmDetector {
    session: ort::session::Session,
    confidence: f32,
    anchors: Vec<[f32; 2]>,
}

impl OnnxPalmDetector {
    /// Load a palm detection ONNX model.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }

    pub fn detect(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>> {
        // 1. Preprocess: letterbox to 192x192, normalize to [0,1], NCHW
        let letterbox = Letterbox::new(frame.width(), frame.height());
        let input_tensor = preprocess(frame, &letterbox, INPUT_SIZE);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() < 2 {
            return Err(format!("Palm model expected 2 outputs, got {}", outputs.len()).into());
        }

        // Converted models disagree on output order; tell them apart by width.
        let first = outputs[0].try_extract_array::<f32>()?;
        let second = outputs[1].try_extract_array::<f32>()?;
        let (regressors, scores) = if first.shape().last() == Some(&NUM_REGRESSORS) {
            (first, second)
        } else {
            (second, first)
        };
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;
        log::trace!(
            "palm outputs: regressors {:?}, scores {:?}",
            regressors.shape(),
            scores.shape()
        );

        // 3. Decode + filter by confidence
        let mut dets = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            &letterbox,
        );

        // 4. NMS
        Ok(nms(&mut dets, NMS_IOU_THRESH))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Square padding that keeps the frame's aspect ratio inside the model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    side: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn new(width: u32, height: u32) -> Self {
        let side = width.max(height) as f32;
        Self {
            side,
            pad_x: (side - width as f32) / 2.0,
            pad_y: (side - height as f32) / 2.0,
        }
    }

    /// Normalized letterbox coordinates to frame pixels.
    fn to_frame(&self, nx: f32, ny: f32) -> (f32, f32) {
        (nx * self.side - self.pad_x, ny * self.side - self.pad_y)
    }
}

/// Letterbox frame into `size × size`, normalize to [0,1] NCHW float32.
///
/// Padding is black; sampling is nearest-neighbour.
fn preprocess(frame: &Frame, letterbox: &Letterbox, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as f32;
    let src_w = frame.width() as f32;
    let s = size as usize;
    let step = letterbox.side / size as f32;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (y as f32 + 0.5) * step - letterbox.pad_y;
        if src_y < 0.0 || src_y >= src_h {
            continue;
        }
        for x in 0..s {
            let src_x = (x as f32 + 0.5) * step - letterbox.pad_x;
            if src_x < 0.0 || src_x >= src_w {
                continue;
            }
            let (sy, sx) = (src_y as usize, src_x as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Anchor generation
// ---------------------------------------------------------------------------

/// Generate SSD anchors for the 192x192 palm model.
///
/// Four layers with strides 8, 16, 16, 16 and two anchors per cell each.
/// Layers sharing a stride are merged onto one grid, so the 12×12 grid
/// carries 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    letterbox: &Letterbox,
) -> Vec<PalmDetection> {
    let scale = INPUT_SIZE as f32;
    let mut dets = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let offset = i * NUM_REGRESSORS;
        let Some(reg) = reg_data.get(offset..offset + NUM_REGRESSORS) else {
            break;
        };
        let anchor = anchors[i];

        let cx = anchor[0] + reg[0] / scale;
        let cy = anchor[1] + reg[1] / scale;
        let w = reg[2] / scale;
        let h = reg[3] / scale;

        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        let mut keypoints = [(0.0, 0.0); NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            let kx = anchor[0] + reg[4 + k * 2] / scale;
            let ky = anchor[1] + reg[4 + k * 2 + 1] / scale;
            *kp = letterbox.to_frame(kx, ky);
        }

        dets.push(PalmDetection {
            bbox: [x1, y1, x2, y2],
            keypoints,
            score,
        });
    }

    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(dets: &mut [PalmDetection], iou_thresh: f32) -> Vec<PalmDetection> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<PalmDetection> = Vec::new();
    for det in dets.iter() {
        if keep
            .iter()
            .all(|kept| bbox_iou(&kept.bbox, &det.bbox) <= iou_thresh)
        {
            keep.push(det.clone());
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn palm(bbox: [f32; 4], score: f32) -> PalmDetection {
        PalmDetection {
            bbox,
            keypoints: [(0.0, 0.0); NUM_KEYPOINTS],
            score,
        }
    }

    #[test]
    fn test_generate_anchors_count() {
        // 24×24 grid × 2 anchors + 12×12 grid × 6 anchors = 1152 + 864 = 2016
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_letterbox_landscape_pads_vertically() {
        let lb = Letterbox::new(1280, 720);
        assert_relative_eq!(lb.side, 1280.0);
        assert_relative_eq!(lb.pad_x, 0.0);
        assert_relative_eq!(lb.pad_y, 280.0);
        assert_eq!(lb.to_frame(0.5, 0.5), (640.0, 360.0));
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let tensor = preprocess(&frame, &Letterbox::new(200, 100), INPUT_SIZE);
        assert_eq!(tensor.shape(), &[1, 3, 192, 192]);
    }

    #[test]
    fn test_preprocess_letterbox_padding_is_black() {
        let frame = Frame::new(vec![255u8; 200 * 100 * 3], 200, 100, 3, 0);
        let tensor = preprocess(&frame, &Letterbox::new(200, 100), INPUT_SIZE);
        // Top rows fall in the padding band, the middle row in the image.
        assert_relative_eq!(tensor[[0, 0, 0, 96]], 0.0);
        assert_relative_eq!(tensor[[0, 0, 96, 96]], 1.0);
    }

    #[test]
    fn test_decode_filters_low_scores() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let regs = vec![0.0; 2 * NUM_REGRESSORS];
        let scores = vec![-5.0, 5.0];
        let dets = decode(&regs, &scores, &anchors, 0.8, &Letterbox::new(192, 192));
        assert_eq!(dets.len(), 1);
        assert!(dets[0].score > 0.99);
    }

    #[test]
    fn test_decode_maps_box_and_keypoints_to_frame() {
        let anchors = vec![[0.5, 0.5]];
        let mut regs = vec![0.0; NUM_REGRESSORS];
        regs[2] = 96.0; // half the input width
        regs[3] = 96.0;
        regs[4] = 0.0; // wrist at the anchor
        regs[5] = 48.0; // ... shifted a quarter down
        let dets = decode(&regs, &[10.0], &anchors, 0.5, &Letterbox::new(384, 384));
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert_relative_eq!(d.bbox[0], 96.0, epsilon = 1e-3);
        assert_relative_eq!(d.bbox[1], 96.0, epsilon = 1e-3);
        assert_relative_eq!(d.bbox[2], 288.0, epsilon = 1e-3);
        assert_relative_eq!(d.bbox[3], 288.0, epsilon = 1e-3);
        assert_relative_eq!(d.wrist().0, 192.0, epsilon = 1e-3);
        assert_relative_eq!(d.wrist().1, 288.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            palm([5.0, 5.0, 105.0, 105.0], 0.7),
            palm([0.0, 0.0, 100.0, 100.0], 0.9),
        ];
        let kept = nms(&mut dets, NMS_IOU_THRESH);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut dets = vec![
            palm([0.0, 0.0, 50.0, 50.0], 0.9),
            palm([200.0, 200.0, 250.0, 250.0], 0.8),
        ];
        let kept = nms(&mut dets, NMS_IOU_THRESH);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].score >= kept[1].score);
    }
}
