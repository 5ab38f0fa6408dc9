use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Substituted when a container reports a missing or implausible rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// Reported rates above this are treated as container glitches.
pub const MAX_PLAUSIBLE_FPS: f64 = 240.0;

/// Whole-second `mm:ss` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timecode {
    pub minutes: u64,
    pub seconds: u64,
}

impl Timecode {
    pub fn from_seconds(total_seconds: u64) -> Self {
        Self {
            minutes: total_seconds / 60,
            seconds: total_seconds % 60,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Half-open time range of a matched window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timecode,
    pub end: Timecode,
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// Clamp a reported frame rate to something usable.
///
/// Some containers report 0 or absurd rates (500+ fps); substituting a
/// default of 30 is a deliberate lossy fallback — timestamps for such a
/// video are approximate, but the match itself still surfaces.
pub fn normalize_fps(fps: f64) -> f64 {
    if !fps.is_finite() || fps <= 0.0 || fps > MAX_PLAUSIBLE_FPS {
        warn!(
            "⚠️ Reported frame rate {} is not plausible, falling back to {}",
            fps, DEFAULT_FPS
        );
        DEFAULT_FPS
    } else {
        fps
    }
}

/// Translate a matched offset range into a time range.
pub fn to_time_range(start_offset: usize, query_length: usize, fps: f64) -> TimeRange {
    let fps = normalize_fps(fps);
    let start_seconds = (start_offset as f64 / fps) as u64;
    let end_seconds = ((start_offset + query_length) as f64 / fps) as u64;
    TimeRange {
        start: Timecode::from_seconds(start_seconds),
        end: Timecode::from_seconds(end_seconds),
    }
}
