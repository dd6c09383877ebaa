pub mod landmark_flattener;
pub mod packet_codec;
