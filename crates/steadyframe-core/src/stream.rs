//! Frame source and sink seams.
//!
//! The stabilizer reads luma frames from a [`FrameSource`] and writes
//! composed output rasters to a [`FrameSink`]. Decoders and encoders live in
//! `steadyframe-media`; the in-memory implementations here back tests and
//! library callers that already hold decoded frames.

use crate::error::{Result, SteadyError};
use crate::frame::LumaFrame;
use std::collections::VecDeque;

/// Produces frames in presentation order.
pub trait FrameSource {
    /// Next frame, or `None` at end of stream.
    fn read_next_frame(&mut self) -> Result<Option<LumaFrame>>;
}

/// Accepts fixed-size rasters in order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &LumaFrame) -> Result<()>;

    /// Flush and finalize the stream. No writes may follow.
    fn finish(&mut self) -> Result<()>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn read_next_frame(&mut self) -> Result<Option<LumaFrame>> {
        (**self).read_next_frame()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn write_frame(&mut self, frame: &LumaFrame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Frame source over frames already in memory.
#[derive(Debug, Default)]
pub struct VecSource {
    frames: VecDeque<LumaFrame>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = LumaFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecSource {
    fn read_next_frame(&mut self) -> Result<Option<LumaFrame>> {
        Ok(self.frames.pop_front())
    }
}

/// Frame sink collecting every written frame.
///
/// The first frame fixes the raster size; later frames must match it.
#[derive(Debug, Default)]
pub struct VecSink {
    pub frames: Vec<LumaFrame>,
    finished: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for VecSink {
    fn write_frame(&mut self, frame: &LumaFrame) -> Result<()> {
        if self.finished {
            return Err(SteadyError::Encoder("write after finish".into()));
        }
        if let Some(first) = self.frames.first() {
            frame.expect_dimensions(first.width, first.height)?;
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
