//! SteadyFrame - command-line video stabilizer.
//!
//! Usage:
//!   steadyframe <INPUT> <OUTPUT> [OPTIONS]

use anyhow::{bail, Context, Result};
use clap::Parser;
use steadyframe_core::{FrameSink, LumaFrame};
use steadyframe_media::{VideoDecoder, VideoEncoder};
use steadyframe_tracking::{LucasKanadeTracker, Stabilizer};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;

use cli::Cli;

/// Sink that opens the encoder lazily, once the frame size is known.
struct LazyEncoder<'a> {
    cli: &'a Cli,
    encoder: Option<VideoEncoder>,
}

impl FrameSink for LazyEncoder<'_> {
    fn write_frame(&mut self, frame: &LumaFrame) -> steadyframe_core::Result<()> {
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => VideoEncoder::create(self.cli.encoder_settings(frame.width / 2, frame.height))?,
        };
        self.encoder.insert(encoder).write_frame(frame)
    }

    fn finish(&mut self) -> steadyframe_core::Result<()> {
        match &mut self.encoder {
            Some(encoder) => encoder.finish(),
            None => Ok(()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SteadyFrame starting...");

    if !steadyframe_media::ffmpeg_available() {
        bail!("ffmpeg was not found on PATH");
    }

    let config = cli.stabilizer_config()?;
    let stabilizer = Stabilizer::new(config, LucasKanadeTracker::default())?;

    let decoder = VideoDecoder::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))?;
    let sink = LazyEncoder {
        cli: &cli,
        encoder: None,
    };

    let report = stabilizer
        .run(decoder, sink)
        .with_context(|| format!("Failed to stabilize {}", cli.input.display()))?;

    if let Some(path) = &cli.trajectory {
        report
            .write_trajectory_json(path)
            .with_context(|| format!("Failed to write trajectory {}", path.display()))?;
        info!("Trajectory written to {}", path.display());
    }

    info!(
        "Wrote {} frames to {} ({} estimation fallbacks, {} unstabilized)",
        report.frames,
        cli.output.display(),
        report.estimation_failures,
        report.singular_warps
    );
    Ok(())
}
