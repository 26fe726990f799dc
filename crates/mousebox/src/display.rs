//! Display sink boundary.
//!
//! Detection never depends on the sink: it is a per-frame side channel that
//! receives the raw frame plus the current detection state and reports back a
//! single cancellation bit. Window rendering stays behind this boundary; the
//! shipped adapter annotates a terminal progress line instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use mousebox_types::{FrameResult, GrayFrame, Region};

use crate::tracker::DetectionState;

pub trait DisplaySink {
    /// Consume one annotated frame. Returns true when the user asked to stop.
    fn render(
        &mut self,
        frame: &GrayFrame,
        region: Region,
        state: &DetectionState,
    ) -> FrameResult<bool>;

    /// Tear down whatever surface the sink drew on. Called once, after the
    /// last frame, on every exit path.
    fn finish(&mut self) {}
}

/// Sink for display-disabled runs: no side effects, never cancels.
pub struct NullSink;

impl DisplaySink for NullSink {
    fn render(
        &mut self,
        _frame: &GrayFrame,
        _region: Region,
        _state: &DetectionState,
    ) -> FrameResult<bool> {
        Ok(false)
    }
}

/// Interactive terminal adapter.
///
/// Draws a per-frame annotation on stderr, paces each frame by blocking for
/// up to one nominal frame interval, and reports cancellation once Ctrl-C has
/// been observed. This is the only place user-driven cancellation enters the
/// loop.
pub struct PacedConsoleSink {
    progress: ProgressBar,
    frame_interval: Duration,
    cancel: Arc<AtomicBool>,
}

impl PacedConsoleSink {
    pub fn new(fps: f64, total_frames: Option<u64>, cancel: Arc<AtomicBool>) -> Self {
        let progress = match total_frames {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{bar:40.green/white} {pos}/{len} frames • {msg}",
                    )
                    .unwrap(),
                );
                bar
            }
            None => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_style(
                    ProgressStyle::with_template("{spinner:.green} frame {pos} • {msg}").unwrap(),
                );
                spinner
            }
        };
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self {
            progress,
            frame_interval: Duration::from_secs_f64(1.0 / fps),
            cancel,
        }
    }
}

impl DisplaySink for PacedConsoleSink {
    fn render(
        &mut self,
        frame: &GrayFrame,
        region: Region,
        state: &DetectionState,
    ) -> FrameResult<bool> {
        self.progress.set_position(state.frame_count());
        let annotation = match state.time_since_entry() {
            Some(inside) => format!("in box: {:.2}s", inside.as_secs_f64()),
            None => "watching".to_string(),
        };
        self.progress.set_message(format!(
            "{}x{} box {},{} {}x{} • {annotation}",
            frame.width(),
            frame.height(),
            region.x,
            region.y,
            region.width,
            region.height,
        ));

        // Hold for one frame interval so playback matches the stream clock;
        // cancellation is sampled after the wait, so the current frame is
        // always fully processed before the loop exits.
        std::thread::sleep(self.frame_interval);
        Ok(self.cancel.load(Ordering::Relaxed))
    }

    fn finish(&mut self) {
        self.progress.finish_and_clear();
    }
}
