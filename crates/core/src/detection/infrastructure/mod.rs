pub mod execution_provider;
pub mod math;
pub mod mediapipe_hand_detector;
pub mod onnx_hand_landmarker;
pub mod onnx_palm_detector;
