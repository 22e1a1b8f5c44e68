//! Feature detection + tracking capability consumed by the motion estimator.

use crate::features::{detect_corners, FeatureParams};
use crate::point_tracker::{LucasKanadeParams, PointTracker, TrackResult};
use crate::pyramid::GrayImage;
use glam::Vec2;
use steadyframe_core::LumaFrame;

/// Sparse correspondence provider.
///
/// Implementations detect salient points in one frame and locate them in
/// the next. The motion estimator only relies on this contract.
pub trait FeatureTracker {
    /// Salient points in `frame`, strongest first.
    fn detect_points(&self, frame: &LumaFrame, params: &FeatureParams) -> Vec<Vec2>;

    /// Locate `points` (given in `prev`) inside `curr`.
    fn track(&self, prev: &LumaFrame, curr: &LumaFrame, points: &[Vec2]) -> TrackResult;
}

impl<T: FeatureTracker + ?Sized> FeatureTracker for &T {
    fn detect_points(&self, frame: &LumaFrame, params: &FeatureParams) -> Vec<Vec2> {
        (**self).detect_points(frame, params)
    }

    fn track(&self, prev: &LumaFrame, curr: &LumaFrame, points: &[Vec2]) -> TrackResult {
        (**self).track(prev, curr, points)
    }
}

/// Shi-Tomasi detection with pyramidal Lucas-Kanade tracking.
#[derive(Debug, Clone, Default)]
pub struct LucasKanadeTracker {
    tracker: PointTracker,
}

impl LucasKanadeTracker {
    pub fn new(params: LucasKanadeParams) -> Self {
        Self {
            tracker: PointTracker::new(params),
        }
    }

    pub fn params(&self) -> &LucasKanadeParams {
        &self.tracker.params
    }
}

impl FeatureTracker for LucasKanadeTracker {
    fn detect_points(&self, frame: &LumaFrame, params: &FeatureParams) -> Vec<Vec2> {
        detect_corners(&GrayImage::from_luma(frame), params)
    }

    fn track(&self, prev: &LumaFrame, curr: &LumaFrame, points: &[Vec2]) -> TrackResult {
        if points.is_empty() {
            return TrackResult::default();
        }
        self.tracker.track(
            &GrayImage::from_luma(prev),
            &GrayImage::from_luma(curr),
            points,
        )
    }
}
