//! Frame-to-frame motion estimation.
//!
//! Correspondences come from a [`FeatureTracker`]; a 4-DOF similarity
//! (rotation, uniform scale, translation) is fitted to them with RANSAC and
//! refined by least squares over the consensus set.

use crate::feature_tracker::FeatureTracker;
use crate::features::FeatureParams;
use glam::{DVec2, Vec2};
use serde::{Deserialize, Serialize};
use steadyframe_core::geometry::SINGULAR_EPSILON;
use steadyframe_core::{LumaFrame, Transform2D};
use thiserror::Error;

/// Fitting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationParams {
    /// Fewer tracked correspondences than this is a degenerate pair.
    pub min_correspondences: usize,
    pub ransac_iterations: u32,
    /// Reprojection distance, in pixels, below which a pair is an inlier.
    pub ransac_threshold: f64,
    /// Fraction of correspondences the consensus set must reach.
    pub min_inlier_ratio: f64,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self {
            min_correspondences: 3,
            ransac_iterations: 500,
            ransac_threshold: 3.0,
            min_inlier_ratio: 0.5,
        }
    }
}

/// Why a frame pair produced no transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationFailure {
    #[error("only {found} tracked correspondences, need {required}")]
    TooFewCorrespondences { found: usize, required: usize },

    #[error("best consensus has {inliers} of {total} correspondences")]
    NoConsensus { inliers: usize, total: usize },

    #[error("correspondences do not constrain a similarity")]
    DegenerateFit,
}

/// Result of estimating one frame pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimation {
    Estimated(Transform2D),
    Failed(EstimationFailure),
}

impl Estimation {
    pub fn transform(&self) -> Option<Transform2D> {
        match self {
            Self::Estimated(t) => Some(*t),
            Self::Failed(_) => None,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

impl From<Result<Transform2D, EstimationFailure>> for Estimation {
    fn from(result: Result<Transform2D, EstimationFailure>) -> Self {
        match result {
            Ok(t) => Self::Estimated(t),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Substitute `last_good` when estimation failed.
///
/// Returns the per-pair transform to use and whether it was estimated.
pub fn resolve_estimate(estimation: &Estimation, last_good: Transform2D) -> (Transform2D, bool) {
    match estimation {
        Estimation::Estimated(t) => (*t, true),
        Estimation::Failed(_) => (last_good, false),
    }
}

/// Estimates the transform taking frame A's points to frame B's.
#[derive(Debug, Clone)]
pub struct MotionEstimator<T> {
    tracker: T,
    pub features: FeatureParams,
    pub params: EstimationParams,
}

impl<T: FeatureTracker> MotionEstimator<T> {
    pub fn new(tracker: T, features: FeatureParams, params: EstimationParams) -> Self {
        Self {
            tracker,
            features,
            params,
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn estimate(&self, prev: &LumaFrame, curr: &LumaFrame) -> Estimation {
        self.estimate_with_hint(prev, curr, None)
    }

    /// Like [`estimate`](Self::estimate), but `hint` points (in `prev`)
    /// replace corner detection when given.
    pub fn estimate_with_hint(
        &self,
        prev: &LumaFrame,
        curr: &LumaFrame,
        hint: Option<&[Vec2]>,
    ) -> Estimation {
        let detected;
        let points = match hint {
            Some(points) => points,
            None => {
                detected = self.tracker.detect_points(prev, &self.features);
                &detected[..]
            }
        };

        let tracked = self.tracker.track(prev, curr, points);
        let (src, dst) = tracked.correspondences(points);
        if src.len() < self.params.min_correspondences {
            return Estimation::Failed(EstimationFailure::TooFewCorrespondences {
                found: src.len(),
                required: self.params.min_correspondences,
            });
        }

        let src: Vec<DVec2> = src.iter().map(|p| p.as_dvec2()).collect();
        let dst: Vec<DVec2> = dst.iter().map(|p| p.as_dvec2()).collect();
        ransac_similarity(&src, &dst, &self.params).into()
    }
}

/// Closed-form least-squares similarity mapping `src` onto `dst`.
///
/// Returns `None` when the source points have no spread or the fit
/// collapses the plane (scale near zero).
pub fn fit_similarity(src: &[DVec2], dst: &[DVec2]) -> Option<Transform2D> {
    let n = src.len().min(dst.len());
    if n < 2 {
        return None;
    }
    let inv_n = 1.0 / n as f64;
    let src_mean = src[..n].iter().copied().sum::<DVec2>() * inv_n;
    let dst_mean = dst[..n].iter().copied().sum::<DVec2>() * inv_n;

    let (mut spread, mut dot, mut cross) = (0.0, 0.0, 0.0);
    for (s, d) in src[..n].iter().zip(&dst[..n]) {
        let a = *s - src_mean;
        let b = *d - dst_mean;
        spread += a.length_squared();
        dot += a.dot(b);
        cross += a.perp_dot(b);
    }
    if spread < 1e-9 {
        return None;
    }
    let p = dot / spread;
    let q = cross / spread;
    if !(p * p + q * q >= SINGULAR_EPSILON) {
        return None;
    }
    let t = dst_mean - DVec2::new(p * src_mean.x - q * src_mean.y, q * src_mean.x + p * src_mean.y);
    let transform = Transform2D::from_rows([[p, -q, t.x], [q, p, t.y]]);
    transform.is_finite().then_some(transform)
}

/// RANSAC similarity fit over 2-point minimal samples.
///
/// Sampling uses a fixed-seed LCG so repeated runs give identical output.
pub fn ransac_similarity(
    src: &[DVec2],
    dst: &[DVec2],
    params: &EstimationParams,
) -> Result<Transform2D, EstimationFailure> {
    let n = src.len().min(dst.len());
    let required = params.min_correspondences.max(2);
    if n < required {
        return Err(EstimationFailure::TooFewCorrespondences { found: n, required });
    }

    let threshold_sq = params.ransac_threshold * params.ransac_threshold;
    let count_inliers = |t: &Transform2D| {
        src[..n]
            .iter()
            .zip(&dst[..n])
            .filter(|(s, d)| t.transform_point(**s).distance_squared(**d) < threshold_sq)
            .count()
    };

    let mut best: Option<(Transform2D, usize)> = None;
    let mut seed = 12345u64;
    for _ in 0..params.ransac_iterations {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let i = (seed >> 33) as usize % n;
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let j = (seed >> 33) as usize % n;
        if i == j {
            continue;
        }
        let Some(model) = fit_similarity(&[src[i], src[j]], &[dst[i], dst[j]]) else {
            continue;
        };
        let inliers = count_inliers(&model);
        if best.map_or(true, |(_, b)| inliers > b) {
            best = Some((model, inliers));
            if inliers == n {
                break;
            }
        }
    }

    let Some((model, _)) = best else {
        return Err(EstimationFailure::DegenerateFit);
    };
    let (inlier_src, inlier_dst): (Vec<DVec2>, Vec<DVec2>) = src[..n]
        .iter()
        .zip(&dst[..n])
        .filter(|(s, d)| model.transform_point(**s).distance_squared(**d) < threshold_sq)
        .map(|(s, d)| (*s, *d))
        .unzip();

    let min_inliers = ((params.min_inlier_ratio * n as f64).ceil() as usize).max(required);
    if inlier_src.len() < min_inliers {
        return Err(EstimationFailure::NoConsensus {
            inliers: inlier_src.len(),
            total: n,
        });
    }
    fit_similarity(&inlier_src, &inlier_dst).ok_or(EstimationFailure::DegenerateFit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_tracker::LucasKanadeTracker;
    use crate::point_tracker::TrackResult;

    fn grid(n: usize) -> Vec<DVec2> {
        (0..n)
            .map(|i| DVec2::new((i % 5) as f64 * 20.0 + 7.0, (i / 5) as f64 * 15.0 + 3.0))
            .collect()
    }

    fn texture_frame(width: u32, height: u32, shift: DVec2) -> LumaFrame {
        let mut frame = LumaFrame::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let (fx, fy) = (x as f64 - shift.x, y as f64 - shift.y);
                let v = 128.0
                    + 60.0 * (fx * 0.31).sin() * (fy * 0.23).cos()
                    + 45.0 * ((fx + 2.0 * fy) * 0.11).sin();
                frame.set(x, y, v.round().clamp(0.0, 255.0) as u8);
            }
        }
        frame
    }

    /// Returns fixed points and a fixed tracking outcome.
    struct ScriptedTracker {
        points: Vec<Vec2>,
        result: TrackResult,
    }

    impl FeatureTracker for ScriptedTracker {
        fn detect_points(&self, _: &LumaFrame, _: &FeatureParams) -> Vec<Vec2> {
            self.points.clone()
        }

        fn track(&self, _: &LumaFrame, _: &LumaFrame, _: &[Vec2]) -> TrackResult {
            self.result.clone()
        }
    }

    #[test]
    fn test_fit_exact_similarity() {
        let truth = Transform2D::similarity(1.1, 0.2, 5.0, -3.0);
        let src = grid(10);
        let dst: Vec<_> = src.iter().map(|p| truth.transform_point(*p)).collect();
        let fit = fit_similarity(&src, &dst).unwrap();
        assert!(fit.approx_eq(&truth, 1e-9));
        assert_eq!(fit.to_rows3()[2], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_fit_rejects_coincident_points() {
        let src = vec![DVec2::new(1.0, 1.0); 4];
        let dst = vec![DVec2::new(2.0, 2.0); 4];
        assert!(fit_similarity(&src, &dst).is_none());
    }

    #[test]
    fn test_fit_rejects_collapsed_destination() {
        let src = grid(6);
        let dst = vec![DVec2::new(5.0, 5.0); 6];
        assert!(fit_similarity(&src, &dst).is_none());
        assert_eq!(
            ransac_similarity(&src, &dst, &EstimationParams::default()),
            Err(EstimationFailure::DegenerateFit)
        );
    }

    #[test]
    fn test_ransac_ignores_outliers() {
        let truth = Transform2D::similarity(0.95, -0.05, -4.0, 2.5);
        let src = grid(25);
        let mut dst: Vec<_> = src.iter().map(|p| truth.transform_point(*p)).collect();
        for k in [2, 7, 11, 19, 23] {
            dst[k] += DVec2::new(40.0, -35.0);
        }
        let fit = ransac_similarity(&src, &dst, &EstimationParams::default()).unwrap();
        assert!(fit.approx_eq(&truth, 1e-6));
    }

    #[test]
    fn test_ransac_requires_consensus() {
        let src = grid(10);
        // Every destination scattered: no two-point model explains half.
        let dst: Vec<_> = src
            .iter()
            .enumerate()
            .map(|(i, p)| *p + DVec2::new((i * i * 37 % 101) as f64, (i * 53 % 89) as f64))
            .collect();
        let params = EstimationParams {
            ransac_threshold: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            ransac_similarity(&src, &dst, &params),
            Err(EstimationFailure::NoConsensus { .. })
        ));
    }

    #[test]
    fn test_too_few_correspondences_fails() {
        let points = vec![Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0), Vec2::new(30.0, 5.0)];
        let tracker = ScriptedTracker {
            result: TrackResult {
                positions: points.clone(),
                found: vec![true, false, true],
            },
            points,
        };
        let estimator =
            MotionEstimator::new(tracker, FeatureParams::default(), EstimationParams::default());
        let frame = LumaFrame::new(8, 8);
        assert_eq!(
            estimator.estimate(&frame, &frame),
            Estimation::Failed(EstimationFailure::TooFewCorrespondences {
                found: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_resolve_estimate_reuses_last_good() {
        let last = Transform2D::translate(2.0, 1.0);
        let failed = Estimation::Failed(EstimationFailure::DegenerateFit);
        assert_eq!(resolve_estimate(&failed, last), (last, false));
        let fresh = Transform2D::translate(-1.0, 0.0);
        assert_eq!(
            resolve_estimate(&Estimation::Estimated(fresh), last),
            (fresh, true)
        );
    }

    #[test]
    fn test_zero_motion_is_identity() {
        let frame = texture_frame(96, 80, DVec2::ZERO);
        let estimator = MotionEstimator::new(
            LucasKanadeTracker::default(),
            FeatureParams::default(),
            EstimationParams::default(),
        );
        let t = estimator.estimate(&frame, &frame).transform().unwrap();
        assert!(t.is_identity_within(1e-6), "{t:?}");
    }

    #[test]
    fn test_constant_translation_recovered() {
        let shift = DVec2::new(3.0, -2.0);
        let prev = texture_frame(128, 96, DVec2::ZERO);
        let curr = texture_frame(128, 96, shift);
        let estimator = MotionEstimator::new(
            LucasKanadeTracker::default(),
            FeatureParams::default(),
            EstimationParams::default(),
        );
        let t = estimator.estimate(&prev, &curr).transform().unwrap();
        assert!((t.translation() - shift).length() < 0.5, "{t:?}");
        assert!((t.similarity_scale() - 1.0).abs() < 0.01);
        assert!(t.rotation().abs() < 0.01);
    }

    #[test]
    fn test_hint_replaces_detection() {
        let frame = texture_frame(96, 80, DVec2::ZERO);
        let estimator = MotionEstimator::new(
            LucasKanadeTracker::default(),
            FeatureParams::default(),
            EstimationParams::default(),
        );
        let hint = [Vec2::new(30.0, 30.0)];
        assert!(matches!(
            estimator.estimate_with_hint(&frame, &frame, Some(&hint)),
            Estimation::Failed(EstimationFailure::TooFewCorrespondences { found: 1, .. })
        ));
    }
}
