pub mod detection_dispatch;
pub mod dispatch_error;
pub mod protocol;
pub mod warmup;
