//! Video decoder using FFmpeg via ffmpeg-sidecar.

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel, OutputVideoFrame};
use ffmpeg_sidecar::iter::FfmpegIterator;
use std::path::Path;
use steadyframe_core::{FrameSource, LumaFrame, Result, SteadyError};
use tracing::{debug, info, warn};

/// Decodes a video file into luma frames in presentation order.
///
/// FFmpeg runs as a subprocess emitting raw `rgb24` frames; each frame is
/// converted to luma on arrival. The raster size is fixed by the first
/// frame and any later change is an error.
pub struct VideoDecoder {
    path: String,
    child: FfmpegChild,
    events: FfmpegIterator,
    dimensions: Option<(u32, u32)>,
    frames_decoded: u64,
    last_error: Option<String>,
    done: bool,
}

impl VideoDecoder {
    /// Spawn FFmpeg for `path`. Fails only if FFmpeg cannot be started;
    /// an unreadable file surfaces on the first read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        info!("Opening video file: {}", path_str);

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(&path_str)
            .rawvideo()
            .spawn()
            .map_err(|e| SteadyError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let events = child
            .iter()
            .map_err(|e| SteadyError::Decoder(format!("Failed to read ffmpeg output: {e}")))?;

        Ok(Self {
            path: path_str,
            child,
            events,
            dimensions: None,
            frames_decoded: 0,
            last_error: None,
            done: false,
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Video dimensions, known once the first frame is decoded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn convert(&mut self, frame: OutputVideoFrame) -> Result<LumaFrame> {
        let luma = match frame.pix_fmt.as_str() {
            "rgb24" => LumaFrame::from_rgb24(&frame.data, frame.width, frame.height)?,
            "rgba" => LumaFrame::from_rgba8(&frame.data, frame.width, frame.height)?,
            "gray" => LumaFrame::from_raw(frame.width, frame.height, frame.data)?,
            other => {
                return Err(SteadyError::Decoder(format!(
                    "unexpected ffmpeg pixel format: {other}"
                )))
            }
        };
        match self.dimensions {
            Some((w, h)) => luma.expect_dimensions(w, h)?,
            None => {
                info!(width = luma.width, height = luma.height, "video stream opened");
                self.dimensions = Some(luma.dimensions());
            }
        }
        self.frames_decoded += 1;
        Ok(luma)
    }
}

impl FrameSource for VideoDecoder {
    fn read_next_frame(&mut self) -> Result<Option<LumaFrame>> {
        if self.done {
            return Ok(None);
        }
        while let Some(event) = self.events.next() {
            match event {
                FfmpegEvent::OutputFrame(frame) => return self.convert(frame).map(Some),
                FfmpegEvent::Error(message)
                | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => {
                    warn!(path = %self.path, "ffmpeg: {}", message);
                    self.last_error = Some(message);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }
        self.done = true;
        debug!(frames = self.frames_decoded, "end of video stream");

        if self.frames_decoded == 0 {
            if let Some(message) = self.last_error.take() {
                return Err(SteadyError::Decoder(format!(
                    "could not decode {}: {}",
                    self.path, message
                )));
            }
        }
        Ok(None)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
