use std::time::Duration;

use log::{debug, info};
use tokio_stream::StreamExt;

use mousebox_decoder::DynFrameProvider;
use mousebox_types::{FrameError, Region};
use mousebox_vision::{first_entered, MotionSegmenter, SegmenterConfig};

use crate::display::DisplaySink;
use crate::tracker::DetectionState;

/// Final state of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub entry_time: Option<Duration>,
    pub frames: u64,
    pub fps: f64,
    pub cancelled: bool,
}

/// Drive the detection loop over every frame of `provider`.
///
/// One frame is fully processed (model, mask, contours, containment, tracker,
/// sink) before the next is requested. Errors carry the number of frames
/// already consumed. The provider stream and the sink are both dropped on
/// every exit path.
pub async fn run_detection(
    provider: DynFrameProvider,
    region: Region,
    sink: &mut dyn DisplaySink,
) -> Result<RunOutcome, (FrameError, u64)> {
    let metadata = provider.metadata();
    let fps = metadata.nominal_fps().ok_or_else(|| {
        (
            FrameError::configuration("failed to read a nominal frame rate from the video"),
            0,
        )
    })?;
    debug!(
        "starting scan: fps {fps}, region {},{} {}x{}",
        region.x, region.y, region.width, region.height
    );

    let mut state = DetectionState::new(fps).map_err(|err| (err, 0))?;
    let mut segmenter = MotionSegmenter::new(SegmenterConfig::default());
    let mut stream = provider.into_stream();

    let result = async {
        let mut cancelled = false;
        while let Some(frame) = stream.next().await {
            let frame = frame.map_err(|err| (err, state.frame_count()))?;
            state.advance_frame();

            let contours = segmenter
                .segment(&frame)
                .map_err(|err| (err, state.frame_count()))?;

            if first_entered(region, &contours).is_some() && state.mark_entered() {
                info!(
                    "object fully inside the box at frame {} ({:.3}s)",
                    state.frame_count(),
                    state.elapsed().as_secs_f64()
                );
            }

            // Detection never stops the scan: later frames still feed the
            // model, so display-enabled runs pace identically whether or not
            // entry has been recorded.
            if sink
                .render(&frame, region, &state)
                .map_err(|err| (err, state.frame_count()))?
            {
                cancelled = true;
                break;
            }
        }
        Ok(cancelled)
    }
    .await;

    sink.finish();
    let cancelled = result?;

    Ok(RunOutcome {
        entry_time: state.entry_time(),
        frames: state.frame_count(),
        fps,
        cancelled,
    })
}
