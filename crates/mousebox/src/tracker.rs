use std::time::Duration;

use mousebox_types::{FrameError, FrameResult};

/// Detection state for one run.
///
/// `entry` transitions exactly once, from unset to a fixed value, and never
/// changes afterward; `frame_count` grows by one per consumed frame. No
/// sentinel values: an unset entry is `None`, so a legitimate zero-second
/// detection stays unambiguous.
#[derive(Debug, Clone)]
pub struct DetectionState {
    entry: Option<Duration>,
    frame_count: u64,
    fps: f64,
}

impl DetectionState {
    pub fn new(fps: f64) -> FrameResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FrameError::configuration(format!(
                "nominal frame rate must be positive, got {fps}"
            )));
        }
        Ok(Self {
            entry: None,
            frame_count: 0,
            fps,
        })
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn entry_time(&self) -> Option<Duration> {
        self.entry
    }

    /// Account for one consumed frame. Call before analyzing the frame so the
    /// first frame is number one.
    pub fn advance_frame(&mut self) {
        self.frame_count += 1;
    }

    /// Record containment at the current frame. The first entry wins: once
    /// set, later calls change nothing. Returns true when this call set it.
    pub fn mark_entered(&mut self) -> bool {
        if self.entry.is_some() {
            return false;
        }
        self.entry = Some(Duration::from_secs_f64(self.frame_count as f64 / self.fps));
        true
    }

    /// Elapsed stream time at the current frame.
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count as f64 / self.fps)
    }

    /// Time since first entry, if entry has been observed.
    pub fn time_since_entry(&self) -> Option<Duration> {
        self.entry.map(|entry| self.elapsed().saturating_sub(entry))
    }
}
