#![cfg(feature = "backend-ffmpeg")]

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::error::{EAGAIN, EWOULDBLOCK};
use ffmpeg_next as ffmpeg;
use log::debug;
use tokio::sync::mpsc;

use crate::core::{
    DynFrameProvider, FrameError, FrameResult, FrameStream, FrameStreamProvider, GrayFrame,
    VideoMetadata, spawn_stream_from_channel,
};

const BACKEND_NAME: &str = "ffmpeg";
const DEFAULT_CHANNEL_CAPACITY: usize = 8;

pub struct FfmpegProvider {
    input: PathBuf,
    channel_capacity: usize,
    metadata: VideoMetadata,
}

impl FfmpegProvider {
    pub fn open<P: AsRef<Path>>(path: P, channel_capacity: Option<usize>) -> FrameResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FrameError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file {} does not exist", path.display()),
            )));
        }
        ffmpeg::init()
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let metadata = probe_metadata(path)?;
        debug!(
            "probed {}: fps {:?}, {:?}x{:?}, {:?} frames",
            path.display(),
            metadata.fps,
            metadata.width,
            metadata.height,
            metadata.total_frames
        );
        Ok(Self {
            input: path.to_path_buf(),
            channel_capacity: channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY),
            metadata,
        })
    }

    fn decode_loop(&self, tx: mpsc::Sender<FrameResult<GrayFrame>>) -> FrameResult<()> {
        let mut ictx = ffmpeg::format::input(&self.input)
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let input_stream = ictx
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| FrameError::backend_failure(BACKEND_NAME, "no video stream found"))?;
        let stream_index = input_stream.index();
        let time_base = input_stream.time_base();

        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        let mut decoder = context
            .decoder()
            .video()
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;

        // Grayscale conversion happens here: whatever the source pixel format,
        // the core only ever sees GRAY8 intensity planes.
        let target_format = ffmpeg::format::pixel::Pixel::GRAY8;
        let mut scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            target_format,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::FAST_BILINEAR,
        )
        .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;

        let mut decoded = ffmpeg::util::frame::Video::empty();
        let mut converted = ffmpeg::util::frame::Video::empty();
        let mut emitted: u64 = 0;

        let mut drain = |decoder: &mut ffmpeg::decoder::Video,
                         emitted: &mut u64|
         -> FrameResult<()> {
            loop {
                match decoder.receive_frame(&mut decoded) {
                    Ok(_) => {
                        scaler.run(&decoded, &mut converted).map_err(|err| {
                            FrameError::backend_failure(BACKEND_NAME, err.to_string())
                        })?;
                        converted.set_pts(decoded.pts());
                        let frame = frame_from_converted(&converted, time_base)?
                            .with_frame_index(Some(*emitted));
                        *emitted += 1;
                        if tx.blocking_send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        if is_retryable_error(&err) || matches!(err, ffmpeg::Error::Eof) {
                            break;
                        }
                        return Err(FrameError::backend_failure(BACKEND_NAME, err.to_string()));
                    }
                }
            }
            Ok(())
        };

        for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            if let Err(err) = decoder.send_packet(&packet) {
                if !is_retryable_error(&err) {
                    return Err(FrameError::backend_failure(BACKEND_NAME, err.to_string()));
                }
            }
            drain(&mut decoder, &mut emitted)?;
        }

        decoder
            .send_eof()
            .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
        drain(&mut decoder, &mut emitted)?;
        Ok(())
    }
}

impl FrameStreamProvider for FfmpegProvider {
    fn metadata(&self) -> VideoMetadata {
        self.metadata
    }

    fn into_stream(self: Box<Self>) -> FrameStream {
        let provider = *self;
        let capacity = provider.channel_capacity;
        spawn_stream_from_channel(capacity, move |tx| {
            let result = provider.decode_loop(tx.clone());
            if let Err(err) = result {
                let _ = tx.blocking_send(Err(err));
            }
        })
    }
}

fn probe_metadata(path: &Path) -> FrameResult<VideoMetadata> {
    let ictx = ffmpeg::format::input(&path)
        .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| FrameError::backend_failure(BACKEND_NAME, "no video stream found"))?;

    let rate = stream.avg_frame_rate();
    let fps = if rate.denominator() != 0 {
        let value = f64::from(rate);
        (value.is_finite() && value > 0.0).then_some(value)
    } else {
        None
    };

    let duration = (ictx.duration() > 0).then(|| {
        Duration::from_secs_f64(ictx.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE))
    });

    let total_frames = u64::try_from(stream.frames()).ok().filter(|&n| n > 0);

    let parameters = stream.parameters();
    let context = ffmpeg::codec::context::Context::from_parameters(parameters)
        .map_err(|err| FrameError::backend_failure(BACKEND_NAME, err.to_string()))?;
    let (width, height) = match context.decoder().video() {
        Ok(video) => (Some(video.width()), Some(video.height())),
        Err(_) => (None, None),
    };

    Ok(VideoMetadata {
        duration,
        fps,
        width,
        height,
        total_frames,
    })
}

fn frame_from_converted(
    frame: &ffmpeg::util::frame::Video,
    time_base: ffmpeg::Rational,
) -> FrameResult<GrayFrame> {
    let plane = frame.data(0);
    let stride = frame.stride(0) as usize;
    let width = frame.width();
    let height = frame.height();
    let mut buffer = Vec::with_capacity(stride * height as usize);
    for row in 0..height as usize {
        let offset = row * stride;
        buffer.extend_from_slice(&plane[offset..offset + stride]);
    }
    let timestamp = frame.pts().map(|pts| {
        let seconds = pts as f64 * f64::from(time_base);
        Duration::from_secs_f64(seconds)
    });
    GrayFrame::from_owned(width, height, stride, timestamp, buffer)
}

fn is_retryable_error(error: &ffmpeg::Error) -> bool {
    matches!(
        error,
        ffmpeg::Error::Other { errno }
            if *errno == EAGAIN || *errno == EWOULDBLOCK
    )
}

pub fn boxed_ffmpeg<P: AsRef<Path>>(
    path: P,
    channel_capacity: Option<usize>,
) -> FrameResult<DynFrameProvider> {
    Ok(Box::new(FfmpegProvider::open(path, channel_capacity)?))
}
