//! Live hand landmark streaming: webcam capture, two-stage ONNX hand
//! detection, and UDP delivery of flattened landmarks.

pub mod capture;
pub mod detection;
pub mod display;
pub mod packet;
pub mod pipeline;
pub mod shared;
pub mod transport;
