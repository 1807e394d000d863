pub mod frame_pipeline;
pub mod status_reporter;
