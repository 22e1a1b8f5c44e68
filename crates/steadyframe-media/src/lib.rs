//! SteadyFrame Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - Video decoding to luma frames
//! - Encoding side-by-side output rasters

pub mod decoder;
pub mod encoder;

pub use decoder::VideoDecoder;
pub use encoder::{EncoderSettings, VideoCodec, VideoEncoder};

/// Whether an `ffmpeg` binary is available on this system.
pub fn ffmpeg_available() -> bool {
    let available = ffmpeg_sidecar::command::ffmpeg_is_installed();
    tracing::debug!(available, "checked for ffmpeg");
    available
}
