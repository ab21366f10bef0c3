pub mod alarm;
pub mod closure;
pub mod config;
pub mod ear;
pub mod link;
pub mod pipeline;
pub mod smoothing;
pub mod source;
pub mod stats;
pub mod types;
#[cfg(feature = "vision")]
pub mod vision;
