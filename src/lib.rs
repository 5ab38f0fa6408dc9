/// clipseek - content-based video clip search
///
/// Fingerprints videos by sampling frames and computing perceptual hashes,
/// persists per-video hash sequences, and finds where a query clip occurs
/// inside any indexed reference video, reported as time ranges.

pub mod config;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod sampler;
pub mod store;
pub mod timecode;
pub mod video;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder, MatchingConfig, SamplingConfig};
pub use crate::encoder::{Fingerprint, FingerprintEncoder};
pub use crate::error::{Error, Result};
pub use crate::matcher::{find_all_matches, MatchOffset};
pub use crate::pipeline::{ComparisonReport, IngestReport, MatchResult, Pipeline};
pub use crate::sampler::{Frame, FrameBatches, FrameSampler};
pub use crate::store::{FingerprintRecord, FingerprintStore};
pub use crate::timecode::{normalize_fps, to_time_range, TimeRange, Timecode};
pub use crate::video::{VideoInfo, VideoLibrary};
