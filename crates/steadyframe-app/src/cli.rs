//! Command-line arguments and their mapping onto stabilizer settings.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use steadyframe_core::FrameRate;
use steadyframe_media::{EncoderSettings, VideoCodec};
use steadyframe_tracking::{ExecutionMode, StabilizerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "steadyframe",
    about = "Stabilize shaky video and write a side-by-side comparison",
    version
)]
pub struct Cli {
    /// Input video file
    pub input: PathBuf,

    /// Output video file ([stabilized | original])
    pub output: PathBuf,

    /// JSON stabilizer config; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reset the trajectory to identity every N frames
    #[arg(long)]
    pub reset_frequency: Option<usize>,

    /// Maximum corners tracked per frame pair
    #[arg(long)]
    pub max_corners: Option<usize>,

    /// Corner quality relative to the strongest corner
    #[arg(long)]
    pub quality_level: Option<f32>,

    /// Minimum distance between corners, in pixels
    #[arg(long)]
    pub min_distance: Option<f32>,

    /// Output frame rate, e.g. 20 or 30000/1001
    #[arg(long, default_value = "20")]
    pub fps: FrameRate,

    /// Output codec: h264|h265|vp9
    #[arg(long, default_value = "h264")]
    pub codec: VideoCodec,

    /// Constant rate factor for the output codec
    #[arg(long)]
    pub crf: Option<u32>,

    /// Warp each frame as soon as it is decoded instead of buffering the video
    #[arg(long)]
    pub streaming: bool,

    /// Write the per-frame trajectory as JSON
    #[arg(long)]
    pub trajectory: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file values (or defaults) with flag overrides applied.
    pub fn stabilizer_config(&self) -> Result<StabilizerConfig> {
        let mut config = match &self.config {
            Some(path) => StabilizerConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => StabilizerConfig::default(),
        };
        if let Some(n) = self.reset_frequency {
            config.reset_frequency = n;
        }
        if let Some(n) = self.max_corners {
            config.features.max_corners = n;
        }
        if let Some(q) = self.quality_level {
            config.features.quality_level = q;
        }
        if let Some(d) = self.min_distance {
            config.features.min_distance = d;
        }
        if self.streaming {
            config.mode = ExecutionMode::Streaming;
        }
        config.validate().context("Invalid stabilizer configuration")?;
        Ok(config)
    }

    /// Encoder settings for input frames of `width`x`height`.
    pub fn encoder_settings(&self, width: u32, height: u32) -> EncoderSettings {
        EncoderSettings::new(&self.output, width * 2, height)
            .with_frame_rate(self.fps)
            .with_codec(self.codec)
            .with_crf(self.crf)
    }
}
