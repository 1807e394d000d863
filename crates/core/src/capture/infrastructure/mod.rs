pub mod frame_scaler;
pub mod image_sequence_source;
