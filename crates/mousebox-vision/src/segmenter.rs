use mousebox_types::{FrameResult, GrayFrame};

use crate::background::{BackgroundModel, BackgroundModelConfig};
use crate::contour::{extract_contours, Contour};
use crate::mask::{binarize, DEFAULT_MASK_THRESHOLD};

#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    pub background: BackgroundModelConfig,
    pub mask_threshold: u8,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            background: BackgroundModelConfig::default(),
            mask_threshold: DEFAULT_MASK_THRESHOLD,
        }
    }
}

/// Per-frame motion segmentation: background model, binarizer, and contour
/// pass composed in pipeline order. Owns the only mutable state in the stack,
/// the background model.
pub struct MotionSegmenter {
    model: BackgroundModel,
    mask_threshold: u8,
}

impl MotionSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            model: BackgroundModel::new(config.background),
            mask_threshold: config.mask_threshold,
        }
    }

    /// Moving-region contours of `frame`, noise-filtered. Mutates the model.
    pub fn segment(&mut self, frame: &GrayFrame) -> FrameResult<Vec<Contour>> {
        let response = self.model.apply(frame)?;
        let mask = binarize(&response, self.mask_threshold);
        Ok(extract_contours(&mask))
    }
}
