//! Adaptive per-pixel background model.
//!
//! Each pixel carries a small mixture of Gaussians over intensity. A sample is
//! classified against the mixture as it stood before the sample arrived, then
//! folded into it; pixels whose current value sits outside every dominant
//! component read as foreground. The model is self-tuning: there is no
//! training phase, and the learning rate ramps from 1 on the first frame down
//! to `1/history` once enough frames have been seen, so stale appearance fades
//! out of the history window on its own.

use log::debug;

use mousebox_types::{FrameError, FrameResult, GrayFrame};

// Upper bound on Gaussian components tracked per pixel.
const MAX_COMPONENTS: usize = 5;
// Variance assigned to a freshly created component.
const INITIAL_VARIANCE: f32 = 225.0;
// Floor and ceiling keeping component variances away from degenerate fits.
const MIN_VARIANCE: f32 = 4.0;
const MAX_VARIANCE: f32 = 5.0 * INITIAL_VARIANCE;
// Cumulative weight share of the sorted mixture treated as background.
const BACKGROUND_RATIO: f32 = 0.9;

// Response levels. Shadow discrimination is disabled, so the grid only ever
// holds these two values; the downstream binarizer is applied regardless.
const RESPONSE_FOREGROUND: u8 = u8::MAX;
const RESPONSE_BACKGROUND: u8 = 0;

pub const DEFAULT_HISTORY: u32 = 500;
pub const DEFAULT_VAR_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Copy)]
pub struct BackgroundModelConfig {
    /// Frames of memory; the steady-state learning rate is `1/history`.
    pub history: u32,
    /// Squared-distance match threshold, scaled by component variance.
    pub var_threshold: f32,
}

impl Default for BackgroundModelConfig {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            var_threshold: DEFAULT_VAR_THRESHOLD,
        }
    }
}

/// One weighted Gaussian over pixel intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gaussian {
    pub weight: f32,
    pub mean: f32,
    pub variance: f32,
}

/// Per-pixel mixture state. Components are kept sorted by descending weight
/// and their weights sum to one whenever the pixel has been observed at least
/// once.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelModel {
    components: [Gaussian; MAX_COMPONENTS],
    len: u8,
}

impl PixelModel {
    pub fn components(&self) -> &[Gaussian] {
        &self.components[..self.len as usize]
    }
}

/// Graded foreground response for one frame. Same dimensions as the frame,
/// recomputed every call, never retained.
#[derive(Debug, Clone)]
pub struct ForegroundResponse {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ForegroundResponse {
    pub(crate) fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Classify one sample against a pixel's mixture and fold it in.
///
/// This is the whole per-pixel transition: callers own the `PixelModel` state
/// explicitly, so the model can be exercised frame-by-frame (or pixel-by-
/// pixel) without a surrounding grid. Returns true when the sample reads as
/// foreground.
pub fn observe_pixel(
    model: &mut PixelModel,
    value: f32,
    learning_rate: f32,
    var_threshold: f32,
) -> bool {
    let len = model.len as usize;

    let mut matched: Option<usize> = None;
    for (i, g) in model.components[..len].iter().enumerate() {
        let d = value - g.mean;
        if d * d <= var_threshold * g.variance {
            matched = Some(i);
            break;
        }
    }

    // Background test: the matched component must lie inside the dominant
    // prefix whose cumulative weight covers BACKGROUND_RATIO.
    let is_background = match matched {
        Some(idx) => {
            let mut cumulative = 0.0f32;
            let mut background = false;
            for (i, g) in model.components[..len].iter().enumerate() {
                if i == idx {
                    background = true;
                    break;
                }
                cumulative += g.weight;
                if cumulative > BACKGROUND_RATIO {
                    break;
                }
            }
            background
        }
        None => false,
    };

    for g in &mut model.components[..len] {
        g.weight *= 1.0 - learning_rate;
    }

    match matched {
        Some(idx) => {
            let g = &mut model.components[idx];
            g.weight += learning_rate;
            let rho = learning_rate / g.weight;
            let d = value - g.mean;
            g.mean += rho * d;
            g.variance = (g.variance + rho * (d * d - g.variance)).clamp(MIN_VARIANCE, MAX_VARIANCE);

            // Restore the descending-weight invariant.
            let mut i = idx;
            while i > 0 && model.components[i].weight > model.components[i - 1].weight {
                model.components.swap(i, i - 1);
                i -= 1;
            }
        }
        None => {
            let fresh = Gaussian {
                weight: learning_rate,
                mean: value,
                variance: INITIAL_VARIANCE,
            };
            let slot = if len < MAX_COMPONENTS {
                model.len += 1;
                len
            } else {
                // Components are sorted by weight, so the last is the weakest.
                MAX_COMPONENTS - 1
            };
            model.components[slot] = fresh;
            let mut i = slot;
            while i > 0 && model.components[i].weight > model.components[i - 1].weight {
                model.components.swap(i, i - 1);
                i -= 1;
            }
        }
    }

    let len = model.len as usize;
    let total: f32 = model.components[..len].iter().map(|g| g.weight).sum();
    if total > 0.0 {
        for g in &mut model.components[..len] {
            g.weight /= total;
        }
    }

    !is_background
}

/// Adaptive background model over a full frame grid.
///
/// Stateful across frames by design: every `apply` both classifies the frame
/// and updates the per-pixel mixtures in place. Dimensions are fixed by the
/// first frame seen.
pub struct BackgroundModel {
    config: BackgroundModelConfig,
    size: Option<(usize, usize)>,
    pixels: Vec<PixelModel>,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(config: BackgroundModelConfig) -> Self {
        Self {
            config,
            size: None,
            pixels: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Classify every pixel of `frame` and fold the frame into the model.
    pub fn apply(&mut self, frame: &GrayFrame) -> FrameResult<ForegroundResponse> {
        let width = frame.width() as usize;
        let height = frame.height() as usize;

        match self.size {
            None => {
                if width == 0 || height == 0 {
                    return Err(FrameError::invalid_frame(format!(
                        "cannot model empty {width}x{height} frame"
                    )));
                }
                debug!(
                    "background model initialized for {width}x{height}, history {}",
                    self.config.history
                );
                self.size = Some((width, height));
                self.pixels = vec![PixelModel::default(); width * height];
            }
            Some((w, h)) if (w, h) != (width, height) => {
                return Err(FrameError::invalid_frame(format!(
                    "frame dimensions changed mid-stream: {w}x{h} -> {width}x{height}"
                )));
            }
            Some(_) => {}
        }

        self.frames_seen += 1;
        let window = self.frames_seen.min(u64::from(self.config.history.max(1)));
        let learning_rate = 1.0 / window as f32;
        let var_threshold = self.config.var_threshold;

        let mut data = vec![RESPONSE_BACKGROUND; width * height];
        for y in 0..height {
            let row = frame.row(y as u32);
            let models = &mut self.pixels[y * width..(y + 1) * width];
            let out = &mut data[y * width..(y + 1) * width];
            for ((&value, model), slot) in row.iter().zip(models.iter_mut()).zip(out.iter_mut()) {
                if observe_pixel(model, f32::from(value), learning_rate, var_threshold) {
                    *slot = RESPONSE_FOREGROUND;
                }
            }
        }

        Ok(ForegroundResponse {
            width,
            height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, fill: u8) -> GrayFrame {
        GrayFrame::from_owned(
            width,
            height,
            width as usize,
            None,
            vec![fill; (width * height) as usize],
        )
        .unwrap()
    }

    #[test]
    fn first_observation_is_foreground() {
        let mut px = PixelModel::default();
        assert!(observe_pixel(&mut px, 100.0, 1.0, DEFAULT_VAR_THRESHOLD));
        assert_eq!(px.components().len(), 1);
        assert!((px.components()[0].weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stable_pixel_settles_into_background() {
        let mut px = PixelModel::default();
        for i in 1..=10u32 {
            let rate = 1.0 / i as f32;
            let fg = observe_pixel(&mut px, 100.0, rate, DEFAULT_VAR_THRESHOLD);
            if i > 1 {
                assert!(!fg, "static pixel flagged foreground at frame {i}");
            }
        }
    }

    #[test]
    fn sudden_deviation_reads_foreground() {
        let mut px = PixelModel::default();
        for i in 1..=30u32 {
            observe_pixel(&mut px, 20.0, 1.0 / i as f32, DEFAULT_VAR_THRESHOLD);
        }
        assert!(observe_pixel(&mut px, 200.0, 1.0 / 31.0, DEFAULT_VAR_THRESHOLD));
    }

    #[test]
    fn small_jitter_stays_background() {
        let mut px = PixelModel::default();
        for i in 1..=30u32 {
            observe_pixel(&mut px, 100.0, 1.0 / i as f32, DEFAULT_VAR_THRESHOLD);
        }
        // Well inside var_threshold * MIN_VARIANCE of the learned mean.
        assert!(!observe_pixel(
            &mut px,
            104.0,
            1.0 / 31.0,
            DEFAULT_VAR_THRESHOLD
        ));
    }

    #[test]
    fn weights_stay_normalized_and_sorted() {
        let mut px = PixelModel::default();
        let samples = [20.0, 20.0, 200.0, 20.0, 90.0, 20.0, 200.0];
        for (i, &s) in samples.iter().enumerate() {
            observe_pixel(&mut px, s, 1.0 / (i as f32 + 1.0), DEFAULT_VAR_THRESHOLD);
            let total: f32 = px.components().iter().map(|g| g.weight).sum();
            assert!((total - 1.0).abs() < 1e-4);
            for pair in px.components().windows(2) {
                assert!(pair[0].weight >= pair[1].weight);
            }
        }
    }

    #[test]
    fn apply_flags_changed_block_only() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        for _ in 0..20 {
            model.apply(&frame(16, 16, 20)).unwrap();
        }

        let mut data = vec![20u8; 16 * 16];
        for y in 4..8 {
            for x in 4..8 {
                data[y * 16 + x] = 220;
            }
        }
        let changed = GrayFrame::from_owned(16, 16, 16, None, data).unwrap();
        let response = model.apply(&changed).unwrap();

        for y in 0..16 {
            for x in 0..16 {
                let expected = (4..8).contains(&x) && (4..8).contains(&y);
                assert_eq!(
                    response.get(x, y) == u8::MAX,
                    expected,
                    "unexpected response at {x},{y}"
                );
            }
        }
    }

    #[test]
    fn apply_rejects_dimension_change() {
        let mut model = BackgroundModel::new(BackgroundModelConfig::default());
        model.apply(&frame(8, 8, 10)).unwrap();
        assert!(model.apply(&frame(8, 9, 10)).is_err());
    }
}
