#[cfg(feature = "backend-ffmpeg")]
pub mod ffmpeg;

#[cfg(feature = "backend-mock")]
pub mod mock;
