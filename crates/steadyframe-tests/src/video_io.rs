//! Round trips through real video files.
//!
//! Skipped when no `ffmpeg` binary is installed.

use crate::footage::shaky_clip;
use glam::DVec2;
use steadyframe_core::{FrameSink, FrameSource, VecSink};
use steadyframe_media::{EncoderSettings, VideoDecoder, VideoEncoder};
use steadyframe_tracking::{LucasKanadeTracker, Stabilizer, StabilizerConfig};

fn write_clip(path: &std::path::Path, frames: usize) {
    let shifts: Vec<_> = (0..frames)
        .map(|i| DVec2::new((i % 3) as f64, (i % 2) as f64))
        .collect();
    let mut encoder = VideoEncoder::create(EncoderSettings::new(path, 64, 48)).unwrap();
    for frame in shaky_clip(64, 48, &shifts) {
        encoder.write_frame(&frame).unwrap();
    }
    encoder.finish().unwrap();
    assert_eq!(encoder.frames_written(), frames as u64);
}

fn read_all(path: &std::path::Path) -> Vec<steadyframe_core::LumaFrame> {
    let mut decoder = VideoDecoder::open(path).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push(frame);
    }
    frames
}

#[test]
fn encode_then_decode_preserves_frame_count() {
    if !steadyframe_media::ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    write_clip(&path, 8);

    let frames = read_all(&path);
    assert_eq!(frames.len(), 8);
    assert!(frames.iter().all(|f| f.dimensions() == (64, 48)));
}

#[test]
fn stabilize_video_file() {
    if !steadyframe_media::ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shaky.mp4");
    let output = dir.path().join("steady.mp4");
    write_clip(&input, 6);

    let stabilizer =
        Stabilizer::new(StabilizerConfig::default(), LucasKanadeTracker::default()).unwrap();
    let encoder = VideoEncoder::create(EncoderSettings::new(&output, 128, 48)).unwrap();
    let report = stabilizer
        .run(VideoDecoder::open(&input).unwrap(), encoder)
        .unwrap();
    assert_eq!(report.frames, 6);

    let frames = read_all(&output);
    assert_eq!(frames.len(), 6);
    assert!(frames.iter().all(|f| f.dimensions() == (128, 48)));
}

#[test]
fn missing_input_is_an_error() {
    if !steadyframe_media::ffmpeg_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let decoder = VideoDecoder::open(dir.path().join("missing.mp4")).unwrap();
    let stabilizer =
        Stabilizer::new(StabilizerConfig::default(), LucasKanadeTracker::default()).unwrap();
    let mut sink = VecSink::new();
    assert!(stabilizer.run(decoder, &mut sink).is_err());
    assert!(sink.frames.is_empty());
}
