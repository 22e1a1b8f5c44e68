//! Video encoder piping raw gray frames into an FFmpeg subprocess.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use steadyframe_core::{FrameRate, FrameSink, LumaFrame, Result, SteadyError};
use tracing::{debug, info};

// ── Format presets ──────────────────────────────────────────────

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    Vp9,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp9 => "libvpx-vp9",
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h264" => Ok(Self::H264),
            "h265" | "hevc" => Ok(Self::H265),
            "vp9" => Ok(Self::Vp9),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

/// Output stream configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub output_path: PathBuf,
    /// Raster width of every written frame.
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub codec: VideoCodec,
    /// CRF value for H.264/H.265/VP9 (lower = better).
    pub crf: Option<u32>,
}

impl EncoderSettings {
    pub fn new(output_path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            output_path: output_path.into(),
            width,
            height,
            frame_rate: FrameRate::default(),
            codec: VideoCodec::default(),
            crf: None,
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_crf(mut self, crf: Option<u32>) -> Self {
        self.crf = crf;
        self
    }

    /// Build the FFmpeg command arguments.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Input from pipe (raw gray frames)
        args.extend_from_slice(&[
            "-y".into(),
            "-hide_banner".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "gray".into(),
            "-video_size".into(),
            format!("{}x{}", self.width, self.height),
            "-framerate".into(),
            self.frame_rate.to_ffmpeg_rate(),
            "-i".into(),
            "pipe:0".into(),
        ]);

        args.extend_from_slice(&["-c:v".into(), self.codec.ffmpeg_encoder().into()]);
        if let Some(crf) = self.crf {
            args.extend_from_slice(&["-crf".into(), crf.to_string()]);
        }
        if self.codec == VideoCodec::Vp9 && self.crf.is_some() {
            // libvpx only honors CRF in constant-quality mode.
            args.extend_from_slice(&["-b:v".into(), "0".into()]);
        }

        // yuv420p needs even dimensions; most players reject gray H.264.
        if self.width % 2 != 0 || self.height % 2 != 0 {
            args.extend_from_slice(&["-vf".into(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".into()]);
        }
        args.extend_from_slice(&["-pix_fmt".into(), "yuv420p".into()]);

        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SteadyError::InvalidParameter(format!(
                "output size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.frame_rate.numerator == 0 || self.frame_rate.denominator == 0 {
            return Err(SteadyError::InvalidParameter(format!(
                "invalid frame rate {}/{}",
                self.frame_rate.numerator, self.frame_rate.denominator
            )));
        }
        Ok(())
    }
}

// ── Encoder ─────────────────────────────────────────────────────

/// Frame sink writing an encoded video file through FFmpeg.
pub struct VideoEncoder {
    settings: EncoderSettings,
    child: Child,
    stdin: Option<ChildStdin>,
    frames_written: u64,
}

impl VideoEncoder {
    /// Spawn FFmpeg for `settings`.
    pub fn create(settings: EncoderSettings) -> Result<Self> {
        settings.validate()?;
        info!(
            path = %settings.output_path.display(),
            width = settings.width,
            height = settings.height,
            rate = %settings.frame_rate,
            codec = settings.codec.ffmpeg_encoder(),
            "Opening video encoder"
        );

        let mut child = Command::new("ffmpeg")
            .args(settings.ffmpeg_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SteadyError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SteadyError::Encoder("Failed to open ffmpeg stdin".into()))?;

        Ok(Self {
            settings,
            child,
            stdin: Some(stdin),
            frames_written: 0,
        })
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl FrameSink for VideoEncoder {
    fn write_frame(&mut self, frame: &LumaFrame) -> Result<()> {
        frame.expect_dimensions(self.settings.width, self.settings.height)?;
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SteadyError::Encoder("write after finish".into()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| SteadyError::Encoder(format!("Failed to write frame: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(stdin) = self.stdin.take() else {
            return Ok(());
        };
        // Close stdin to signal end-of-stream
        drop(stdin);

        let status = self
            .child
            .wait()
            .map_err(|e| SteadyError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        if !status.success() {
            return Err(SteadyError::Encoder(format!(
                "ffmpeg exited with status: {}",
                status
            )));
        }
        debug!(frames = self.frames_written, "encoder finished");
        Ok(())
    }
}

impl Drop for VideoEncoder {
    fn drop(&mut self) {
        // Unfinished stream: stop ffmpeg.
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
