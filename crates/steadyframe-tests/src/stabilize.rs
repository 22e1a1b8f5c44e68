//! End-to-end stabilization over synthetic footage.
//!
//! Exercises steadyframe-tracking's stabilizer through the in-memory
//! frame source/sink from steadyframe-core.

use crate::footage::{interior_mad, left_half, right_half, shaky_clip, textured};
use glam::{DVec2, Vec2};
use steadyframe_core::{LumaFrame, Transform2D, VecSink, VecSource};
use steadyframe_tracking::{
    ExecutionMode, FeatureParams, FeatureTracker, LucasKanadeTracker, RunReport, Stabilizer,
    StabilizerConfig, TrackResult,
};

// ── Helpers ────────────────────────────────────────────────────

fn config(mode: ExecutionMode, reset_frequency: usize) -> StabilizerConfig {
    StabilizerConfig {
        reset_frequency,
        mode,
        ..Default::default()
    }
}

fn stabilize(
    config: StabilizerConfig,
    frames: Vec<LumaFrame>,
) -> (RunReport, Vec<LumaFrame>) {
    let stabilizer = Stabilizer::new(config, LucasKanadeTracker::default()).unwrap();
    let mut sink = VecSink::new();
    let report = stabilizer.run(VecSource::new(frames), &mut sink).unwrap();
    assert!(sink.is_finished());
    (report, sink.frames)
}

const MODES: [ExecutionMode; 2] = [ExecutionMode::Buffered, ExecutionMode::Streaming];

/// Tracks every point one pixel right, except into frames tagged with 1 in
/// their corner pixel, where every point lands on a single location.
struct CollapsingTracker;

impl FeatureTracker for CollapsingTracker {
    fn detect_points(&self, _: &LumaFrame, _: &FeatureParams) -> Vec<Vec2> {
        (0..6)
            .map(|i| Vec2::new(10.0 + 7.0 * i as f32, 8.0 + 5.0 * (i % 3) as f32))
            .collect()
    }

    fn track(&self, _: &LumaFrame, curr: &LumaFrame, points: &[Vec2]) -> TrackResult {
        let positions = if curr.get(0, 0) == 1 {
            vec![Vec2::new(5.0, 5.0); points.len()]
        } else {
            points.iter().map(|p| *p + Vec2::X).collect()
        };
        TrackResult {
            positions,
            found: vec![true; points.len()],
        }
    }
}

/// Blank frames tagged with their index in the corner pixel.
fn tagged(n: usize) -> Vec<LumaFrame> {
    (0..n)
        .map(|i| {
            let mut frame = LumaFrame::new(64, 48);
            frame.set(0, 0, i as u8);
            frame
        })
        .collect()
}

// ── Frame accounting ───────────────────────────────────────────

#[test]
fn output_frame_count_matches_input() {
    for mode in MODES {
        for n in [1, 2, 6] {
            let shifts: Vec<_> = (0..n).map(|i| DVec2::new(i as f64, 0.0)).collect();
            let (report, out) = stabilize(config(mode, 100), shaky_clip(64, 48, &shifts));
            assert_eq!(out.len(), n, "{mode:?}");
            assert_eq!(report.frames, n);
            assert_eq!(report.trajectory.len(), n);
            assert!(out.iter().all(|f| f.dimensions() == (128, 48)));
        }
    }
}

#[test]
fn right_half_is_the_original_frame() {
    let shifts = [DVec2::ZERO, DVec2::new(2.0, 1.0), DVec2::new(-1.0, 2.0)];
    let input = shaky_clip(64, 48, &shifts);
    let (_, out) = stabilize(StabilizerConfig::default(), input.clone());
    for (raster, original) in out.iter().zip(&input) {
        assert_eq!(&right_half(raster), original);
    }
}

// ── Motion ─────────────────────────────────────────────────────

#[test]
fn static_footage_is_left_untouched() {
    let frame = textured(96, 72, DVec2::ZERO);
    let (report, out) = stabilize(StabilizerConfig::default(), vec![frame.clone(); 4]);
    assert_eq!(report.estimation_failures, 0);
    for entry in &report.trajectory {
        assert!(entry.is_identity_within(1e-6), "{entry:?}");
    }
    for raster in &out {
        assert!(interior_mad(&left_half(raster), &frame, 1) < 0.01);
    }
}

#[test]
fn constant_translation_is_recovered() {
    let shift = DVec2::new(3.0, -2.0);
    let (report, _) = stabilize(
        StabilizerConfig::default(),
        shaky_clip(128, 96, &[DVec2::ZERO, shift]),
    );
    let entry = report.trajectory[1];
    assert!((entry.translation() - shift).length() < 0.5, "{entry:?}");
    assert!((entry.similarity_scale() - 1.0).abs() < 0.01);
    assert!(entry.rotation().abs() < 0.01);
}

#[test]
fn jitter_is_removed() {
    let shifts = [
        DVec2::ZERO,
        DVec2::new(2.0, 1.0),
        DVec2::new(0.0, 2.0),
        DVec2::new(2.0, 0.0),
        DVec2::new(1.0, 1.0),
    ];
    let input = shaky_clip(128, 96, &shifts);
    for mode in MODES {
        let (report, out) = stabilize(config(mode, 100), input.clone());
        for (k, raster) in out.iter().enumerate().skip(1) {
            let entry = report.trajectory[k];
            assert!((entry.translation() - shifts[k]).length() < 0.5, "frame {k}: {entry:?}");

            let steadied = interior_mad(&left_half(raster), &input[0], 12);
            let shaky = interior_mad(&input[k], &input[0], 12);
            assert!(steadied < 4.0, "frame {k}: {steadied}");
            assert!(steadied < shaky / 4.0, "frame {k}: {steadied} vs {shaky}");
        }
    }
}

#[test]
fn trajectory_resets_to_identity() {
    let shifts: Vec<_> = (0..12).map(|i| DVec2::new(i as f64, 0.0)).collect();
    for mode in MODES {
        let (report, _) = stabilize(config(mode, 5), shaky_clip(96, 72, &shifts));
        assert_eq!(report.resets, 3);
        for k in [0, 5, 10] {
            assert_eq!(report.trajectory[k], Transform2D::IDENTITY);
        }
        // Accumulation restarts from the reset entry.
        let after = report.trajectory[7].translation();
        assert!((after - DVec2::new(2.0, 0.0)).length() < 0.5, "{after:?}");
    }
}

// ── Failure handling ───────────────────────────────────────────

#[test]
fn featureless_footage_falls_back_to_identity() {
    let flat = LumaFrame::from_raw(64, 48, vec![128; 64 * 48]).unwrap();
    for mode in MODES {
        let (report, out) = stabilize(config(mode, 100), vec![flat.clone(); 5]);
        assert_eq!(out.len(), 5);
        assert_eq!(report.estimation_failures, 4);
        assert_eq!(report.trajectory, vec![Transform2D::IDENTITY; 5]);
        assert_eq!(report.estimated, vec![false; 5]);
    }
}

#[test]
fn collapsed_fit_falls_back_instead_of_going_singular() {
    for mode in MODES {
        let stabilizer = Stabilizer::new(config(mode, 100), CollapsingTracker).unwrap();
        let mut sink = VecSink::new();
        let report = stabilizer.run(VecSource::new(tagged(8)), &mut sink).unwrap();
        assert_eq!(sink.frames.len(), 8);
        assert_eq!(report.estimation_failures, 1);
        assert_eq!(report.singular_warps, 0);
        assert_eq!(report.trajectory[1], Transform2D::IDENTITY);
        let last = report.trajectory[7];
        assert!(last.approx_eq(&Transform2D::translate(6.0, 0.0), 1e-9), "{last:?}");
    }
}

#[test]
fn singular_entries_pass_frames_through() {
    let input = shaky_clip(64, 48, &[DVec2::ZERO; 3]);
    let collapse = Transform2D::from_rows([[0.0, 0.0, 5.0], [0.0, 0.0, 5.0]]);
    let stabilizer =
        Stabilizer::new(StabilizerConfig::default(), LucasKanadeTracker::default()).unwrap();
    let (trajectory, stabilized) = stabilizer.stabilize_frames(
        &input,
        &[Transform2D::IDENTITY, collapse, Transform2D::IDENTITY],
    );
    assert!(trajectory[1].try_inverse().is_err());
    assert!(trajectory[2].try_inverse().is_err());
    let flags: Vec<_> = stabilized.iter().map(|(_, ok)| *ok).collect();
    assert_eq!(flags, vec![true, false, false]);
    for ((frame, _), original) in stabilized.iter().zip(&input) {
        assert_eq!(frame, original);
    }
}

// ── Persistence ────────────────────────────────────────────────

#[test]
fn trajectory_json_export() {
    let shifts: Vec<_> = (0..6).map(|i| DVec2::new(0.0, i as f64)).collect();
    let (report, _) = stabilize(config(ExecutionMode::Buffered, 3), shaky_clip(96, 72, &shifts));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trajectory.json");
    report.write_trajectory_json(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let records: serde_json::Value = serde_json::from_str(&text).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 6);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record["index"], i);
        assert_eq!(record["reset"], i % 3 == 0);
        assert_eq!(record["matrix"][2], serde_json::json!([0.0, 0.0, 1.0]));
    }
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("steadyframe.json");
    std::fs::write(
        &path,
        r#"{ "reset_frequency": 2, "mode": "streaming", "features": { "max_corners": 80 } }"#,
    )
    .unwrap();

    let config = StabilizerConfig::from_json_file(&path).unwrap();
    assert_eq!(config.mode, ExecutionMode::Streaming);
    assert_eq!(config.features.max_corners, 80);
    assert_eq!(config.features.min_distance, FeatureParams::default().min_distance);

    let shifts: Vec<_> = (0..5).map(|i| DVec2::new(i as f64, 0.0)).collect();
    let (report, _) = stabilize(config, shaky_clip(64, 48, &shifts));
    assert_eq!(report.resets, 3);
}

#[test]
fn malformed_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ reset_frequency: }").unwrap();
    assert!(StabilizerConfig::from_json_file(&path).is_err());
}
