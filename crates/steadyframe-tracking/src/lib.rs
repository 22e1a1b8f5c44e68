//! SteadyFrame Tracking - Motion estimation and video stabilization.
//!
//! Per frame pair, corners are detected and tracked with pyramidal
//! Lucas-Kanade, a similarity transform is fitted with RANSAC, the per-pair
//! transforms are chained into a periodically reset trajectory, and each
//! frame is warped through the inverse of its trajectory entry.

pub mod estimate;
pub mod feature_tracker;
pub mod features;
pub mod pipeline;
pub mod point_tracker;
pub mod pyramid;
pub mod trajectory;
pub mod warp;

pub use estimate::{
    fit_similarity, ransac_similarity, resolve_estimate, Estimation, EstimationFailure,
    EstimationParams, MotionEstimator,
};
pub use feature_tracker::{FeatureTracker, LucasKanadeTracker};
pub use features::{detect_corners, FeatureParams};
pub use pipeline::{ExecutionMode, PairTransforms, RunReport, Stabilizer, StabilizerConfig};
pub use point_tracker::{LucasKanadeParams, PointTracker, TrackResult};
pub use pyramid::{compute_gradients, GrayImage, ImagePyramid};
pub use trajectory::{
    Trajectory, TrajectoryAccumulator, TrajectoryRecord, DEFAULT_RESET_FREQUENCY,
};
pub use warp::{resample_affine, FrameWarper, Interpolation, WarpParams};
