use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

pub use mousebox_types::{FrameError, FrameResult, GrayFrame};

pub type FrameStream = Pin<Box<dyn Stream<Item = FrameResult<GrayFrame>> + Send>>;

pub type DynFrameProvider = Box<dyn FrameStreamProvider>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VideoMetadata {
    pub duration: Option<Duration>,
    /// Nominal frame rate, fixed for the whole run.
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub total_frames: Option<u64>,
}

impl VideoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration_and_fps(duration: Duration, fps: f64) -> Self {
        Self {
            duration: Some(duration),
            fps: Some(fps),
            ..Default::default()
        }
    }

    /// The nominal rate, if it is usable for timing arithmetic.
    pub fn nominal_fps(&self) -> Option<f64> {
        self.fps.filter(|fps| fps.is_finite() && *fps > 0.0)
    }

    pub fn calculate_total_frames(&self) -> Option<u64> {
        if let Some(total) = self.total_frames {
            return Some(total);
        }

        if let (Some(duration), Some(fps)) = (self.duration, self.fps) {
            let seconds = duration.as_secs_f64();
            let total = (seconds * fps).round();
            if total.is_finite() && total >= 0.0 {
                return Some(total as u64);
            }
        }

        None
    }
}

pub trait FrameStreamProvider: Send + 'static {
    fn metadata(&self) -> VideoMetadata {
        VideoMetadata::default()
    }

    fn into_stream(self: Box<Self>) -> FrameStream;
}

pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<FrameResult<GrayFrame>>) + Send + 'static,
) -> FrameStream {
    let (tx, rx) = mpsc::channel(capacity);
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[test]
    fn metadata_total_frames_derives_from_duration() {
        let metadata = VideoMetadata::with_duration_and_fps(Duration::from_secs(3), 30.0);
        assert_eq!(metadata.calculate_total_frames(), Some(90));
        assert_eq!(metadata.nominal_fps(), Some(30.0));
    }

    #[test]
    fn zero_fps_is_not_nominal() {
        let metadata = VideoMetadata {
            fps: Some(0.0),
            ..Default::default()
        };
        assert_eq!(metadata.nominal_fps(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawn_stream_from_channel_pushes_values() {
        let stream = spawn_stream_from_channel(2, move |tx| {
            tx.blocking_send(Ok(
                GrayFrame::from_owned(2, 2, 2, None, vec![1, 2, 3, 4]).unwrap()
            ))
            .unwrap();
        });
        let mut stream = stream;
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.data(), &[1, 2, 3, 4]);
    }
}
