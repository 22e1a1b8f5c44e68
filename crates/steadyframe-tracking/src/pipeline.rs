//! Stabilization driver.
//!
//! Sequences motion estimation, trajectory accumulation and warping over a
//! frame stream, emitting `[stabilized | original]` rasters in input order.

use crate::estimate::{resolve_estimate, Estimation, EstimationParams, MotionEstimator};
use crate::feature_tracker::FeatureTracker;
use crate::features::FeatureParams;
use crate::trajectory::{
    Trajectory, TrajectoryAccumulator, TrajectoryRecord, DEFAULT_RESET_FREQUENCY,
};
use crate::warp::{FrameWarper, WarpParams};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use steadyframe_core::{FrameSink, FrameSource, LumaFrame, Result, SteadyError, Transform2D};
use tracing::{debug, info};

/// How frames flow through the warp phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Decode everything, then warp all frames in parallel. Memory grows
    /// with the frame count.
    #[default]
    Buffered,
    /// Warp and emit each frame as soon as its trajectory entry is known.
    /// At most two decoded frames are held at once.
    Streaming,
}

/// Stabilizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Trajectory entries at multiples of this index are reset to identity.
    pub reset_frequency: usize,
    pub features: FeatureParams,
    pub estimation: EstimationParams,
    pub warp: WarpParams,
    pub mode: ExecutionMode,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            reset_frequency: DEFAULT_RESET_FREQUENCY,
            features: FeatureParams::default(),
            estimation: EstimationParams::default(),
            warp: WarpParams::default(),
            mode: ExecutionMode::default(),
        }
    }
}

impl StabilizerConfig {
    /// Load a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| SteadyError::Serialization(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SteadyError::InvalidParameter(msg.to_string()));
        if self.reset_frequency == 0 {
            return invalid("reset_frequency must be at least 1");
        }
        if self.features.max_corners == 0 {
            return invalid("max_corners must be at least 1");
        }
        if !(self.features.quality_level > 0.0) {
            return invalid("quality_level must be positive");
        }
        if !(self.features.min_distance >= 0.0) {
            return invalid("min_distance must not be negative");
        }
        if self.estimation.min_correspondences < 2 {
            return invalid("min_correspondences must be at least 2");
        }
        if self.estimation.ransac_iterations == 0 {
            return invalid("ransac_iterations must be at least 1");
        }
        if !(self.estimation.ransac_threshold > 0.0) {
            return invalid("ransac_threshold must be positive");
        }
        let ratio = self.estimation.min_inlier_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return invalid("min_inlier_ratio must be in (0, 1]");
        }
        Ok(())
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub frames: usize,
    /// Frame pairs whose transform was reused from the previous pair.
    pub estimation_failures: usize,
    /// Frames emitted unstabilized because their entry was singular.
    pub singular_warps: usize,
    /// Trajectory entries forced to identity (index 0 included).
    pub resets: usize,
    pub trajectory: Trajectory,
    /// Per frame: whether its per-pair transform was estimated. Always
    /// `false` for frame 0, which has no pair.
    pub estimated: Vec<bool>,
    reset_frequency: usize,
}

impl RunReport {
    pub fn trajectory_records(&self) -> Vec<TrajectoryRecord> {
        self.trajectory
            .iter()
            .enumerate()
            .map(|(index, entry)| TrajectoryRecord {
                index,
                matrix: entry.to_rows3(),
                reset: self.reset_frequency > 0 && index % self.reset_frequency == 0,
                estimated: self.estimated.get(index).copied().unwrap_or(false),
            })
            .collect()
    }

    /// Write the trajectory as pretty-printed JSON.
    pub fn write_trajectory_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.trajectory_records())
            .map_err(|e| SteadyError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Per-pair transforms for a frame sequence, with estimation flags.
#[derive(Debug, Clone, Default)]
pub struct PairTransforms {
    /// `transforms[0]` is the identity placeholder for the first frame.
    pub transforms: Vec<Transform2D>,
    /// `estimated[0]` is `false`: the placeholder is not an estimate.
    pub estimated: Vec<bool>,
}

impl PairTransforms {
    fn new() -> Self {
        Self {
            transforms: vec![Transform2D::IDENTITY],
            estimated: vec![false],
        }
    }

    fn failures(&self) -> usize {
        self.estimated.iter().skip(1).filter(|&&e| !e).count()
    }
}

/// Motion estimation state carried between consecutive frames.
struct PairStep<'a, T> {
    estimator: &'a MotionEstimator<T>,
    pairs: PairTransforms,
}

impl<'a, T: FeatureTracker> PairStep<'a, T> {
    fn next(&mut self, index: usize, prev: &LumaFrame, curr: &LumaFrame) -> Transform2D {
        let estimation = self.estimator.estimate(prev, curr);
        // transforms is never empty: it starts with the identity placeholder.
        let last = self.pairs.transforms[self.pairs.transforms.len() - 1];
        let (transform, estimated) = resolve_estimate(&estimation, last);
        if let Estimation::Failed(reason) = &estimation {
            debug!(frame = index, %reason, "motion estimation failed, reusing previous transform");
        }
        self.pairs.transforms.push(transform);
        self.pairs.estimated.push(estimated);
        transform
    }
}

/// Video stabilizer over a pluggable feature tracker.
pub struct Stabilizer<T> {
    config: StabilizerConfig,
    estimator: MotionEstimator<T>,
    warper: FrameWarper,
}

impl<T: FeatureTracker + Sync> Stabilizer<T> {
    pub fn new(config: StabilizerConfig, tracker: T) -> Result<Self> {
        config.validate()?;
        let estimator = MotionEstimator::new(
            tracker,
            config.features.clone(),
            config.estimation.clone(),
        );
        let warper = FrameWarper::new(config.warp.clone());
        Ok(Self {
            config,
            estimator,
            warper,
        })
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &MotionEstimator<T> {
        &self.estimator
    }

    /// Per-pair transforms for an in-memory frame sequence.
    pub fn estimate_transforms(&self, frames: &[LumaFrame]) -> PairTransforms {
        if frames.is_empty() {
            return PairTransforms::default();
        }
        let mut step = PairStep {
            estimator: &self.estimator,
            pairs: PairTransforms::new(),
        };
        for (i, pair) in frames.windows(2).enumerate() {
            step.next(i + 1, &pair[0], &pair[1]);
        }
        step.pairs
    }

    /// Accumulate `transforms` into a trajectory and warp every frame in
    /// parallel. Returns the stabilized frames (in input order) with a
    /// per-frame flag that is `false` for unstabilized pass-throughs.
    pub fn stabilize_frames(
        &self,
        frames: &[LumaFrame],
        transforms: &[Transform2D],
    ) -> (Trajectory, Vec<(LumaFrame, bool)>) {
        let trajectory = TrajectoryAccumulator::accumulate(self.config.reset_frequency, transforms);
        let stabilized = frames
            .par_iter()
            .zip(trajectory.par_iter())
            .map(|(frame, entry)| self.warper.warp_or_passthrough(frame, entry))
            .collect();
        (trajectory, stabilized)
    }

    /// Stabilize every frame of `source` into `sink`.
    ///
    /// The sink receives one `[stabilized | original]` raster per input frame
    /// and is finished on success. A source without a first frame is fatal.
    pub fn run<S: FrameSource, K: FrameSink>(&self, mut source: S, mut sink: K) -> Result<RunReport> {
        let first = source
            .read_next_frame()?
            .ok_or_else(|| SteadyError::Decoder("could not read the initial frame".into()))?;
        info!(
            width = first.width,
            height = first.height,
            mode = ?self.config.mode,
            reset_frequency = self.config.reset_frequency,
            "stabilizing"
        );

        let report = match self.config.mode {
            ExecutionMode::Buffered => self.run_buffered(first, &mut source, &mut sink)?,
            ExecutionMode::Streaming => self.run_streaming(first, &mut source, &mut sink)?,
        };
        sink.finish()?;

        info!(
            frames = report.frames,
            estimation_failures = report.estimation_failures,
            singular_warps = report.singular_warps,
            resets = report.resets,
            "stabilization finished"
        );
        Ok(report)
    }

    fn run_buffered<S: FrameSource, K: FrameSink>(
        &self,
        first: LumaFrame,
        source: &mut S,
        sink: &mut K,
    ) -> Result<RunReport> {
        let (width, height) = first.dimensions();
        let mut frames = vec![first];
        let mut step = PairStep {
            estimator: &self.estimator,
            pairs: PairTransforms::new(),
        };
        while let Some(curr) = source.read_next_frame()? {
            curr.expect_dimensions(width, height)?;
            step.next(frames.len(), &frames[frames.len() - 1], &curr);
            frames.push(curr);
        }
        let pairs = step.pairs;
        debug!(frames = frames.len(), "decoded all frames, warping");

        let (trajectory, stabilized) = self.stabilize_frames(&frames, &pairs.transforms);
        let mut singular_warps = 0;
        for (original, (warped, ok)) in frames.iter().zip(&stabilized) {
            if !ok {
                singular_warps += 1;
            }
            sink.write_frame(&LumaFrame::side_by_side(warped, original)?)?;
        }

        Ok(self.report(trajectory, pairs, singular_warps))
    }

    fn run_streaming<S: FrameSource, K: FrameSink>(
        &self,
        first: LumaFrame,
        source: &mut S,
        sink: &mut K,
    ) -> Result<RunReport> {
        let (width, height) = first.dimensions();
        let mut accumulator = TrajectoryAccumulator::new(self.config.reset_frequency);
        let mut trajectory = Vec::new();
        let mut singular_warps = 0;
        let mut step = PairStep {
            estimator: &self.estimator,
            pairs: PairTransforms::new(),
        };

        let mut emit = |frame: &LumaFrame, per_pair: Transform2D, trajectory: &mut Trajectory| {
            let entry = accumulator.push(per_pair);
            trajectory.push(entry);
            let (warped, ok) = self.warper.warp_or_passthrough(frame, &entry);
            if !ok {
                singular_warps += 1;
            }
            sink.write_frame(&LumaFrame::side_by_side(&warped, frame)?)
        };

        emit(&first, Transform2D::IDENTITY, &mut trajectory)?;
        let mut prev = first;
        while let Some(curr) = source.read_next_frame()? {
            curr.expect_dimensions(width, height)?;
            let per_pair = step.next(trajectory.len(), &prev, &curr);
            emit(&curr, per_pair, &mut trajectory)?;
            prev = curr;
        }

        Ok(self.report(trajectory, step.pairs, singular_warps))
    }

    fn report(&self, trajectory: Trajectory, pairs: PairTransforms, singular_warps: usize) -> RunReport {
        let frequency = self.config.reset_frequency;
        RunReport {
            frames: trajectory.len(),
            estimation_failures: pairs.failures(),
            singular_warps,
            resets: trajectory.len().div_ceil(frequency),
            trajectory,
            estimated: pairs.estimated,
            reset_frequency: frequency,
        }
    }
}
