//! Face enrollment and verification over a live frame feed.
//!
//! Bounded contexts:
//! - `capture`: frame sources and working-size scaling
//! - `detection`: the detector seam and its result types
//! - `dispatch`: the request/reply protocol and the detection worker thread
//! - `enrollment`: enrollment, verification and reference files
//! - `pipeline`: the tick-driven controller tying them together

pub mod capture;
pub mod detection;
pub mod dispatch;
pub mod enrollment;
pub mod pipeline;
pub mod shared;
