use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the fingerprinting and comparison pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The source video could not be opened or decoded. Fatal for that
    /// video; never retried.
    #[error("failed to decode video {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// A stored fingerprint could not be parsed back into a comparable
    /// form. During comparison this degrades to a maximal-distance
    /// fingerprint instead of aborting.
    #[error("invalid stored fingerprint: {text}")]
    HashConversion { text: String },

    /// A store record references a video file no longer present on disk.
    #[error("reference video file missing: {0}")]
    MissingReferenceFile(PathBuf),

    /// Matching an empty query would trivially match everywhere.
    #[error("query fingerprint sequence is empty")]
    EmptyQuery,

    #[error("fingerprint store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
