//! SteadyFrame Core - Foundation types for video stabilization
//!
//! This crate provides the fundamental types used throughout SteadyFrame:
//! - Single-channel frame buffers
//! - Homogeneous 2D affine transforms
//! - Frame rates
//! - Frame source/sink seams

pub mod error;
pub mod frame;
pub mod geometry;
pub mod stream;
pub mod time;

pub use error::{Result, SteadyError};
pub use frame::LumaFrame;
pub use geometry::Transform2D;
pub use stream::{FrameSink, FrameSource, VecSink, VecSource};
pub use time::FrameRate;
