//! Batch entry-time detection: scan a video for the first moment a moving
//! object sits fully inside a fixed rectangular region.

pub mod cli;
pub mod display;
pub mod pipeline;
pub mod tracker;
