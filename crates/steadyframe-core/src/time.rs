//! Frame rate representation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// FFmpeg-style `num/den` rate string.
    pub fn to_ffmpeg_rate(self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }

    /// Common frame rates
    pub const FPS_20: Self = Self::new(20, 1);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    /// Side-by-side comparison output is written at 20 fps.
    fn default() -> Self {
        Self::FPS_20
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

impl FromStr for FrameRate {
    type Err = String;

    /// Parses `"25"` or `"30000/1001"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s.trim(), "1"),
        };
        let numerator: u32 = num
            .parse()
            .map_err(|_| format!("invalid frame rate numerator: {num:?}"))?;
        let denominator: u32 = den
            .parse()
            .map_err(|_| format!("invalid frame rate denominator: {den:?}"))?;
        if numerator == 0 || denominator == 0 {
            return Err(format!("frame rate must be positive: {s:?}"));
        }
        Ok(Self::new(numerator, denominator))
    }
}
