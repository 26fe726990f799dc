//! Motion segmentation for the mousebox pipeline.
//!
//! The stages mirror the per-frame data flow: an adaptive background model
//! produces a foreground response, a fixed threshold binarizes it, and the
//! contour pass extracts connected foreground regions that survive the noise
//! filter. Containment of a region's bounding box inside the configured box
//! is evaluated last.

pub mod background;
pub mod containment;
pub mod contour;
pub mod mask;

mod segmenter;

pub use background::{BackgroundModel, BackgroundModelConfig, ForegroundResponse};
pub use containment::{first_entered, is_entered};
pub use contour::{extract_contours, Contour, MIN_CONTOUR_AREA};
pub use mask::{binarize, ForegroundMask, DEFAULT_MASK_THRESHOLD};
pub use segmenter::{MotionSegmenter, SegmenterConfig};
