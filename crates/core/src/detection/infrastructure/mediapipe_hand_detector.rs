/// Two-stage hand detector: palm detection, then landmarks on a rotated crop.
///
/// While a hand stays confidently tracked, its next ROI is derived from the
/// current landmarks and the palm stage is skipped.
use std::path::Path;

use crate::detection::domain::hand_detector::HandDetector;
use crate::detection::domain::hand_roi::HandRoi;
use crate::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_MAX_HANDS, DEFAULT_TRACKING_CONFIDENCE,
};
use crate::shared::frame::Frame;
use crate::shared::landmark::{Hand, Handedness, Landmark, NUM_LANDMARKS};

use super::onnx_hand_landmarker::{LandmarkResult, OnnxHandLandmarker};
use super::onnx_palm_detector::{OnnxPalmDetector, PalmDetection};

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Minimum palm score for a new hand to be considered.
    pub detection_confidence: f32,
    /// Minimum landmark presence for a hand to be reported and tracked.
    pub tracking_confidence: f32,
    pub max_hands: usize,
    /// Swap Left/Right so labels describe an unmirrored camera image.
    pub flip_handedness: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
            tracking_confidence: DEFAULT_TRACKING_CONFIDENCE,
            max_hands: DEFAULT_MAX_HANDS,
            flip_handedness: true,
        }
    }
}

/// First stage: finds palms in the full frame.
pub trait PalmStage: Send {
    fn detect_palms(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>>;
}

/// Second stage: landmarks inside one ROI.
pub trait LandmarkStage: Send {
    fn estimate(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<LandmarkResult, Box<dyn std::error::Error>>;
}

impl PalmStage for OnnxPalmDetector {
    fn detect_palms(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>> {
        self.detect(frame)
    }
}

impl LandmarkStage for OnnxHandLandmarker {
    fn estimate(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<LandmarkResult, Box<dyn std::error::Error>> {
        OnnxHandLandmarker::estimate(self, frame, roi)
    }
}

pub struct MediapipeHandDetector<P = OnnxPalmDetector, L = OnnxHandLandmarker> {
    palm: P,
    landmarker: L,
    config: DetectorConfig,
    tracked: Vec<HandRoi>,
}

impl MediapipeHandDetector {
    /// Load both ONNX models.
    pub fn from_models(
        palm_model: &Path,
        landmark_model: &Path,
        config: DetectorConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let palm = OnnxPalmDetector::new(palm_model, config.detection_confidence)?;
        let landmarker = OnnxHandLandmarker::new(landmark_model)?;
        Ok(Self::new(palm, landmarker, config))
    }
}

impl<P: PalmStage, L: LandmarkStage> MediapipeHandDetector<P, L> {
    pub fn new(palm: P, landmarker: L, config: DetectorConfig) -> Self {
        Self {
            palm,
            landmarker,
            config,
            tracked: Vec::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Number of hands carried over from the previous frame.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Forget tracked hands so the next frame runs palm detection.
    pub fn reset(&mut self) {
        self.tracked.clear();
    }

    fn candidate_rois(&mut self, frame: &Frame) -> Result<Vec<HandRoi>, Box<dyn std::error::Error>> {
        let mut rois = std::mem::take(&mut self.tracked);
        if rois.len() >= self.config.max_hands {
            rois.truncate(self.config.max_hands);
            return Ok(rois);
        }

        for palm in self.palm.detect_palms(frame)? {
            if rois.len() >= self.config.max_hands {
                break;
            }
            if palm.score < self.config.detection_confidence {
                continue;
            }
            let roi = HandRoi::from_palm(palm.bbox, palm.wrist(), palm.middle_finger_base());
            if rois.iter().any(|existing| overlaps(existing, &roi)) {
                continue;
            }
            rois.push(roi);
        }
        Ok(rois)
    }

    fn to_hand(&self, result: &LandmarkResult) -> Hand {
        let landmarks: [Landmark; NUM_LANDMARKS] = std::array::from_fn(|i| {
            let (x, y, z) = result.points[i];
            Landmark::new(x as i32, y as i32, z as i32)
        });
        let handedness = if result.handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };
        let handedness = if self.config.flip_handedness {
            handedness.flipped()
        } else {
            handedness
        };
        Hand::new(landmarks, handedness, result.presence)
    }
}

impl<P: PalmStage, L: LandmarkStage> HandDetector for MediapipeHandDetector<P, L> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Hand>, Box<dyn std::error::Error>> {
        let rois = self.candidate_rois(frame)?;

        let mut hands = Vec::with_capacity(rois.len());
        let mut next_rois = Vec::with_capacity(rois.len());
        for roi in &rois {
            let result = self.landmarker.estimate(frame, roi)?;
            if result.presence < self.config.tracking_confidence {
                log::trace!("dropping hand with presence {:.2}", result.presence);
                continue;
            }
            if let Some(next) = HandRoi::from_landmarks(&result.xy()) {
                next_rois.push(next);
            }
            hands.push(self.to_hand(&result));
        }

        self.tracked = next_rois;
        Ok(hands)
    }
}

/// Two ROIs are treated as the same hand when their centers are closer than
/// half the larger ROI.
fn overlaps(a: &HandRoi, b: &HandRoi) -> bool {
    let dx = a.center_x - b.center_x;
    let dy = a.center_y - b.center_y;
    (dx * dx + dy * dy).sqrt() < a.size.max(b.size) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubPalms {
        palms: Vec<PalmDetection>,
        calls: Arc<Mutex<usize>>,
    }

    impl PalmStage for StubPalms {
        fn detect_palms(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<PalmDetection>, Box<dyn std::error::Error>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.palms.clone())
        }
    }

    /// Returns an upright hand centered on the ROI, with scripted presence.
    struct StubLandmarker {
        presences: Vec<f32>,
        handedness: f32,
        calls: usize,
    }

    impl LandmarkStage for StubLandmarker {
        fn estimate(
            &mut self,
            _frame: &Frame,
            roi: &HandRoi,
        ) -> Result<LandmarkResult, Box<dyn std::error::Error>> {
            let presence = self
                .presences
                .get(self.calls)
                .copied()
                .unwrap_or(0.0);
            self.calls += 1;
            let points = std::array::from_fn(|i| {
                (
                    roi.center_x,
                    roi.center_y + 40.0 - i as f32 * 4.0,
                    -(i as f32),
                )
            });
            Ok(LandmarkResult {
                points,
                presence,
                handedness: self.handedness,
            })
        }
    }

    fn palm_at(cx: f32, cy: f32, score: f32) -> PalmDetection {
        let mut keypoints = [(cx, cy); 7];
        keypoints[0] = (cx, cy + 40.0);
        keypoints[2] = (cx, cy - 40.0);
        PalmDetection {
            bbox: [cx - 50.0, cy - 50.0, cx + 50.0, cy + 50.0],
            keypoints,
            score,
        }
    }

    fn detector(
        palms: Vec<PalmDetection>,
        presences: Vec<f32>,
        config: DetectorConfig,
    ) -> (MediapipeHandDetector<StubPalms, StubLandmarker>, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let palm = StubPalms {
            palms,
            calls: calls.clone(),
        };
        let landmarker = StubLandmarker {
            presences,
            handedness: 0.9,
            calls: 0,
        };
        (MediapipeHandDetector::new(palm, landmarker, config), calls)
    }

    #[test]
    fn test_default_config_is_single_hand_high_confidence() {
        let config = DetectorConfig::default();
        assert_eq!(config.max_hands, 1);
        assert_eq!(config.detection_confidence, 0.8);
        assert_eq!(config.tracking_confidence, 0.5);
        assert!(config.flip_handedness);
    }

    #[test]
    fn test_no_palm_no_hand() {
        let (mut det, _) = detector(vec![], vec![], DetectorConfig::default());
        let hands = det.detect(&Frame::blank(640, 480, 0)).unwrap();
        assert!(hands.is_empty());
        assert_eq!(det.tracked_count(), 0);
    }

    #[test]
    fn test_detected_hand_is_tracked_and_skips_palm_stage() {
        let (mut det, palm_calls) = detector(
            vec![palm_at(300.0, 200.0, 0.95)],
            vec![0.9, 0.9],
            DetectorConfig::default(),
        );
        let frame = Frame::blank(640, 480, 0);

        assert_eq!(det.detect(&frame).unwrap().len(), 1);
        assert_eq!(det.tracked_count(), 1);
        assert_eq!(det.detect(&frame).unwrap().len(), 1);
        assert_eq!(*palm_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_low_presence_drops_hand_and_tracking() {
        let (mut det, palm_calls) = detector(
            vec![palm_at(300.0, 200.0, 0.95)],
            vec![0.2, 0.2],
            DetectorConfig::default(),
        );
        let frame = Frame::blank(640, 480, 0);

        assert!(det.detect(&frame).unwrap().is_empty());
        assert_eq!(det.tracked_count(), 0);
        det.detect(&frame).unwrap();
        assert_eq!(*palm_calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_low_palm_score_is_ignored() {
        let (mut det, _) = detector(
            vec![palm_at(300.0, 200.0, 0.5)],
            vec![0.9],
            DetectorConfig::default(),
        );
        assert!(det.detect(&Frame::blank(640, 480, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_single_hand_mode_caps_results() {
        let (mut det, _) = detector(
            vec![palm_at(100.0, 200.0, 0.95), palm_at(500.0, 200.0, 0.9)],
            vec![0.9, 0.9],
            DetectorConfig::default(),
        );
        assert_eq!(det.detect(&Frame::blank(640, 480, 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_two_hand_mode_skips_duplicate_palms() {
        let config = DetectorConfig {
            max_hands: 2,
            ..DetectorConfig::default()
        };
        let (mut det, _) = detector(
            vec![
                palm_at(100.0, 200.0, 0.95),
                palm_at(105.0, 205.0, 0.9),
                palm_at(500.0, 200.0, 0.85),
            ],
            vec![0.9, 0.9],
            config,
        );
        let hands = det.detect(&Frame::blank(640, 480, 0)).unwrap();
        assert_eq!(hands.len(), 2);
    }

    #[test]
    fn test_handedness_flipped_by_default() {
        let (mut det, _) = detector(
            vec![palm_at(300.0, 200.0, 0.95)],
            vec![0.9],
            DetectorConfig::default(),
        );
        let hands = det.detect(&Frame::blank(640, 480, 0)).unwrap();
        assert_eq!(hands[0].handedness(), Handedness::Left);
    }

    #[test]
    fn test_landmarks_truncate_to_integers() {
        let (mut det, _) = detector(
            vec![palm_at(300.0, 200.0, 0.95)],
            vec![0.9],
            DetectorConfig::default(),
        );
        let hands = det.detect(&Frame::blank(640, 480, 0)).unwrap();
        let wrist = hands[0].landmarks()[0];
        assert_eq!(wrist.z, 0);
        assert_eq!(hands[0].landmarks()[20].z, -20);
    }

    #[test]
    fn test_reset_forgets_tracking() {
        let (mut det, palm_calls) = detector(
            vec![palm_at(300.0, 200.0, 0.95)],
            vec![0.9, 0.9],
            DetectorConfig::default(),
        );
        let frame = Frame::blank(640, 480, 0);
        det.detect(&frame).unwrap();
        det.reset();
        det.detect(&frame).unwrap();
        assert_eq!(*palm_calls.lock().unwrap(), 2);
    }
}
