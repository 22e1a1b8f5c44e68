//! Integration test crate for SteadyFrame.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the stabilizer end to end over synthetic footage and, when an
//! `ffmpeg` binary is present, through real video files.

#[cfg(test)]
mod footage;

#[cfg(test)]
mod stabilize;

#[cfg(test)]
mod video_io;
