//! Scripted synthetic frame source.
//!
//! Generates a flat grayscale background with zero or more rectangular blobs
//! painted over it. Each blob appears at a scripted frame, optionally
//! disappears at another, and drifts with a fixed per-frame velocity. This is
//! the whole test surface for the detection pipeline: a blob that appears over
//! a settled background reads as foreground to the model.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::core::{
    DynFrameProvider, FrameResult, FrameStream, FrameStreamProvider, GrayFrame, VideoMetadata,
};

/// Rectangular blob scripted into the synthetic scene.
#[derive(Debug, Clone, Copy)]
pub struct MockBlob {
    /// First frame index (0-based) the blob is visible.
    pub from_frame: u64,
    /// Frame index the blob disappears again; `None` keeps it to the end.
    pub until_frame: Option<u64>,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    /// Per-frame drift applied after `from_frame`.
    pub dx: i64,
    pub dy: i64,
    pub luma: u8,
}

impl MockBlob {
    /// Static blob visible from `from_frame` to the end of the stream.
    pub fn appearing(from_frame: u64, x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            from_frame,
            until_frame: None,
            x,
            y,
            width,
            height,
            dx: 0,
            dy: 0,
            luma: 220,
        }
    }

    pub fn until(mut self, frame: u64) -> Self {
        self.until_frame = Some(frame);
        self
    }

    pub fn drifting(mut self, dx: i64, dy: i64) -> Self {
        self.dx = dx;
        self.dy = dy;
        self
    }

    fn position_at(&self, frame: u64) -> Option<(i64, i64)> {
        if frame < self.from_frame {
            return None;
        }
        if let Some(until) = self.until_frame {
            if frame >= until {
                return None;
            }
        }
        let elapsed = (frame - self.from_frame) as i64;
        Some((self.x + elapsed * self.dx, self.y + elapsed * self.dy))
    }
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    frame_count: u64,
    width: u32,
    height: u32,
    stride: usize,
    fps: f64,
    background_luma: u8,
    blobs: Vec<MockBlob>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(90, 320, 240, 30.0)
    }
}

impl MockProvider {
    pub fn new(frame_count: u64, width: u32, height: u32, fps: f64) -> Self {
        Self {
            frame_count,
            width,
            height,
            stride: width as usize,
            fps,
            background_luma: 24,
            blobs: Vec::new(),
        }
    }

    pub fn with_background(mut self, luma: u8) -> Self {
        self.background_luma = luma;
        self
    }

    pub fn with_blob(mut self, blob: MockBlob) -> Self {
        self.blobs.push(blob);
        self
    }

    fn generate_frame(&self, index: u64) -> GrayFrame {
        let mut data = vec![self.background_luma; self.stride * self.height as usize];
        for blob in &self.blobs {
            let Some((bx, by)) = blob.position_at(index) else {
                continue;
            };
            let x0 = bx.clamp(0, i64::from(self.width)) as usize;
            let y0 = by.clamp(0, i64::from(self.height)) as usize;
            let x1 = (bx + i64::from(blob.width)).clamp(0, i64::from(self.width)) as usize;
            let y1 = (by + i64::from(blob.height)).clamp(0, i64::from(self.height)) as usize;
            for row in y0..y1 {
                data[row * self.stride + x0..row * self.stride + x1].fill(blob.luma);
            }
        }
        let timestamp = Duration::try_from_secs_f64(index as f64 / self.fps).ok();
        GrayFrame::from_owned(self.width, self.height, self.stride, timestamp, data)
            .expect("mock frame construction should not fail")
            .with_frame_index(Some(index))
    }
}

impl FrameStreamProvider for MockProvider {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            duration: Duration::try_from_secs_f64(self.frame_count as f64 / self.fps).ok(),
            fps: Some(self.fps),
            width: Some(self.width),
            height: Some(self.height),
            total_frames: Some(self.frame_count),
        }
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = (provider.frame_count.min(8)).max(1) as usize;
        let (tx, rx) = mpsc::channel::<FrameResult<GrayFrame>>(capacity);
        tokio::spawn(async move {
            for index in 0..provider.frame_count {
                let frame = provider.generate_frame(index);
                if tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }
}

pub fn boxed_mock() -> DynFrameProvider {
    Box::new(MockProvider::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test(flavor = "multi_thread")]
    async fn mock_stream_yields_requested_frames() {
        let provider = MockProvider::new(3, 8, 8, 30.0);
        let stream = Box::new(provider) as DynFrameProvider;
        let mut stream = stream.into_stream();
        let mut frames = Vec::new();
        while let Some(frame) = stream.next().await {
            frames.push(frame.unwrap());
        }
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].width(), 8);
        assert_eq!(frames[0].frame_index(), Some(0));
        assert_eq!(frames[2].frame_index(), Some(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scripted_blob_is_painted_at_the_right_frames() {
        let provider = MockProvider::new(4, 16, 16, 30.0)
            .with_background(10)
            .with_blob(MockBlob::appearing(2, 4, 4, 4, 4));
        let stream = Box::new(provider) as DynFrameProvider;
        let mut stream = stream.into_stream();
        let mut frames = Vec::new();
        while let Some(frame) = stream.next().await {
            frames.push(frame.unwrap());
        }
        assert_eq!(frames[1].row(5)[5], 10);
        assert_eq!(frames[2].row(5)[5], 220);
        assert_eq!(frames[3].row(5)[5], 220);
        assert_eq!(frames[3].row(1)[1], 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drifting_blob_moves_and_clips_at_the_edge() {
        let provider = MockProvider::new(3, 16, 16, 30.0)
            .with_blob(MockBlob::appearing(0, 12, 0, 8, 4).drifting(2, 0));
        let stream = Box::new(provider) as DynFrameProvider;
        let mut stream = stream.into_stream();
        let first = stream.next().await.unwrap().unwrap();
        // Painted from x=12 to the clipped right edge.
        assert_eq!(first.row(0)[11], 24);
        assert_eq!(first.row(0)[12], 220);
        assert_eq!(first.row(0)[15], 220);
    }

    #[test]
    fn metadata_reports_nominal_rate() {
        let provider = MockProvider::new(60, 32, 32, 25.0);
        let metadata = provider.metadata();
        assert_eq!(metadata.fps, Some(25.0));
        assert_eq!(metadata.total_frames, Some(60));
        assert_eq!(metadata.width, Some(32));
    }
}
