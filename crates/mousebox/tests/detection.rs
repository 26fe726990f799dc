//! End-to-end detection runs over scripted synthetic streams.

use std::time::Duration;

use mousebox::display::{DisplaySink, NullSink};
use mousebox::pipeline::run_detection;
use mousebox::tracker::DetectionState;
use mousebox_decoder::backends::mock::{MockBlob, MockProvider};
use mousebox_decoder::DynFrameProvider;
use mousebox_types::{FrameResult, GrayFrame, Region};

fn boxed(provider: MockProvider) -> DynFrameProvider {
    Box::new(provider)
}

/// Sink that requests cancellation once the given frame count is reached.
struct CancelAfter(u64);

impl DisplaySink for CancelAfter {
    fn render(
        &mut self,
        _frame: &GrayFrame,
        _region: Region,
        state: &DetectionState,
    ) -> FrameResult<bool> {
        Ok(state.frame_count() >= self.0)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn no_motion_never_enters() {
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(60, 160, 120, 30.0);

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, None);
    assert_eq!(outcome.frames, 60);
    assert!(!outcome.cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn entry_time_is_first_containment_frame_over_fps() {
    // Blob appears fully inside the region on the 30th frame of a 30 fps
    // stream, so the reported entry time is exactly one second. The run still
    // consumes all 90 frames: detection never ends the scan early.
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(90, 160, 120, 30.0)
        .with_blob(MockBlob::appearing(29, 20, 20, 30, 30));

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, Some(Duration::from_secs(1)));
    assert_eq!(outcome.frames, 90);
    assert!(!outcome.cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn entry_time_is_idempotent_across_exit_and_reentry() {
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(90, 160, 120, 30.0)
        .with_blob(MockBlob::appearing(29, 20, 20, 30, 30).until(45))
        .with_blob(MockBlob::appearing(59, 50, 50, 30, 30));

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, Some(Duration::from_secs(1)));
    assert_eq!(outcome.frames, 90);
}

#[tokio::test(flavor = "multi_thread")]
async fn overlap_without_full_enclosure_never_triggers() {
    // The blob straddles the region's right edge for the whole stream.
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(60, 160, 120, 30.0)
        .with_blob(MockBlob::appearing(29, 80, 40, 30, 30));

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn sub_noise_floor_blob_never_triggers() {
    // 20x20 = 400 filled pixels, below the fixed 500-pixel contour floor.
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(60, 160, 120, 30.0)
        .with_blob(MockBlob::appearing(29, 30, 30, 20, 20));

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, None);
    assert_eq!(outcome.frames, 60);
}

#[tokio::test(flavor = "multi_thread")]
async fn disjoint_blob_never_enters() {
    let region = Region::new(0, 0, 60, 60).unwrap();
    let provider = MockProvider::new(60, 200, 120, 30.0)
        .with_blob(MockBlob::appearing(19, 120, 40, 30, 30));

    let outcome = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap();

    assert_eq!(outcome.entry_time, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_stops_after_the_current_frame() {
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(90, 160, 120, 30.0);

    let outcome = run_detection(boxed(provider), region, &mut CancelAfter(10))
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.frames, 10);
    assert_eq!(outcome.entry_time, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_preserves_recorded_entry() {
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(90, 160, 120, 30.0)
        .with_blob(MockBlob::appearing(29, 20, 20, 30, 30));

    let outcome = run_detection(boxed(provider), region, &mut CancelAfter(40))
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.frames, 40);
    assert_eq!(outcome.entry_time, Some(Duration::from_secs(1)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unusable_frame_rate_fails_before_any_frame() {
    let region = Region::new(0, 0, 100, 100).unwrap();
    let provider = MockProvider::new(10, 32, 32, 0.0);

    let err = run_detection(boxed(provider), region, &mut NullSink)
        .await
        .unwrap_err();

    assert_eq!(err.1, 0);
}
