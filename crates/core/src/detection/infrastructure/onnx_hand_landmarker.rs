/// 21-point hand landmark model using ONNX Runtime via `ort`.
///
/// Runs on a rotated square crop described by a [`HandRoi`] and projects the
/// predicted points back into frame pixels.
use std::path::Path;

use crate::detection::domain::hand_roi::HandRoi;
use crate::shared::frame::Frame;
use crate::shared::landmark::NUM_LANDMARKS;

use super::execution_provider::load_session;
use super::math::as_probability;

/// Landmark model input resolution.
const INPUT_SIZE: u32 = 224;

/// Raw landmark model output for one crop, in frame coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkResult {
    /// `(x, y, z)` in frame pixels; `z` shares the ROI's pixel scale.
    pub points: [(f32, f32, f32); NUM_LANDMARKS],
    /// Hand presence confidence, 0.0 to 1.0.
    pub presence: f32,
    /// Right-hand probability in the model's mirrored convention.
    pub handedness: f32,
}

impl LandmarkResult {
    pub fn xy(&self) -> Vec<(f32, f32)> {
        self.points.iter().map(|&(x, y, _)| (x, y)).collect()
    }
}

pub struct OnnxHandLandmarker {
    session: ort::session::Session,
}

impl OnnxHandLandmarker {
    /// Load a hand landmark ONNX model.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }

    pub fn estimate(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<LandmarkResult, Box<dyn std::error::Error>> {
        let input_tensor = crop(frame, roi, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs: screen landmarks [1, 63], presence [1, 1], handedness [1, 1],
        // and optionally world landmarks [1, 63].
        if outputs.len() < 3 {
            return Err(format!(
                "Hand landmark model expected at least 3 outputs, got {}",
                outputs.len()
            )
            .into());
        }

        let landmarks = outputs[0].try_extract_array::<f32>()?;
        let presence = outputs[1].try_extract_array::<f32>()?;
        let handedness = outputs[2].try_extract_array::<f32>()?;
        log::trace!(
            "landmark outputs: {:?} presence {:?} handedness {:?}",
            landmarks.shape(),
            presence.iter().next(),
            handedness.iter().next()
        );

        let lm_data = landmarks.as_slice().ok_or("Cannot get landmark slice")?;
        let presence = presence.iter().next().copied().ok_or("Empty presence output")?;
        let handedness = handedness
            .iter()
            .next()
            .copied()
            .ok_or("Empty handedness output")?;

        project(lm_data, roi, INPUT_SIZE, presence, handedness)
    }
}

/// Bilinear crop of `roi` into a `size × size` [0,1] NCHW tensor.
///
/// Samples outside the frame are black.
fn crop(frame: &Frame, roi: &HandRoi, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let w = frame.width() as i64;
    let h = frame.height() as i64;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    let sample = |x: i64, y: i64, c: usize| -> f32 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0.0
        } else {
            src[[y as usize, x as usize, c]] as f32
        }
    };

    for v in 0..s {
        for u in 0..s {
            let (fx, fy) = roi.to_frame(
                (u as f32 + 0.5) / size as f32,
                (v as f32 + 0.5) / size as f32,
            );
            // Pixel centers sit at +0.5
            let (fx, fy) = (fx - 0.5, fy - 0.5);
            let x0 = fx.floor() as i64;
            let y0 = fy.floor() as i64;
            let ax = fx - x0 as f32;
            let ay = fy - y0 as f32;

            for c in 0..3 {
                let top = sample(x0, y0, c) * (1.0 - ax) + sample(x0 + 1, y0, c) * ax;
                let bottom = sample(x0, y0 + 1, c) * (1.0 - ax) + sample(x0 + 1, y0 + 1, c) * ax;
                tensor[[0, c, v, u]] = (top * (1.0 - ay) + bottom * ay) / 255.0;
            }
        }
    }

    tensor
}

/// Maps raw model landmarks (input pixel units) back into the frame.
fn project(
    lm_data: &[f32],
    roi: &HandRoi,
    input_size: u32,
    raw_presence: f32,
    raw_handedness: f32,
) -> Result<LandmarkResult, Box<dyn std::error::Error>> {
    if lm_data.len() < NUM_LANDMARKS * 3 {
        return Err(format!(
            "Expected {} landmark values, got {}",
            NUM_LANDMARKS * 3,
            lm_data.len()
        )
        .into());
    }

    let scale = input_size as f32;
    let mut points = [(0.0, 0.0, 0.0); NUM_LANDMARKS];
    for (point, coords) in points.iter_mut().zip(lm_data.chunks_exact(3)) {
        let (x, y) = roi.to_frame(coords[0] / scale, coords[1] / scale);
        let z = coords[2] / scale * roi.size;
        *point = (x, y, z);
    }

    Ok(LandmarkResult {
        points,
        presence: as_probability(raw_presence),
        handedness: as_probability(raw_handedness),
    })
}
