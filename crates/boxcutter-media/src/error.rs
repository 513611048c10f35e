//! Error types for boxcutter-media.

use crate::mp4::BoxPath;
use std::io;
use thiserror::Error;

/// Result type for boxcutter-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for boxcutter-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading from the byte source failed or came up short.
    #[error("I/O error reading {length} bytes at offset {offset}: {source}")]
    Io {
        offset: u64,
        length: u64,
        #[source]
        source: io::Error,
    },

    /// A box header or size violates the container layout.
    #[error("Malformed container at {path} (offset {offset}): {reason}")]
    MalformedContainer {
        path: BoxPath,
        offset: u64,
        reason: String,
    },

    /// A box payload is shorter than its fixed layout requires.
    #[error("Truncated box {path} at offset {offset}: need {need} bytes, have {have}")]
    TruncatedBox {
        path: BoxPath,
        offset: u64,
        need: u64,
        have: u64,
    },

    /// A recognised box family in a form that is not handled.
    #[error("Unsupported variant of {path} at offset {offset}: {detail}")]
    UnsupportedVariant {
        path: BoxPath,
        offset: u64,
        detail: String,
    },

    /// A mandatory child box is absent.
    #[error("Missing required box {path} (parent at offset {offset})")]
    MissingRequiredBox { path: BoxPath, offset: u64 },

    /// The selected track's sample table lacks one of stsz, stsc or stco/co64.
    #[error("Missing sample table box {path} (stbl at offset {offset})")]
    MissingSampleTable { path: BoxPath, offset: u64 },

    /// The sample tables disagree with each other or with the file.
    #[error("Inconsistent sample table at {path} (offset {offset}): {detail}")]
    SampleTableInconsistent {
        path: BoxPath,
        offset: u64,
        detail: String,
    },

    /// A NAL unit length prefix runs past the end of its sample.
    #[error(
        "Short sample {index} in {path} at offset {offset}: NAL unit at byte {position} declares {declared} bytes, {remaining} remain"
    )]
    ShortSample {
        path: BoxPath,
        index: u32,
        offset: u64,
        position: usize,
        declared: u64,
        remaining: usize,
    },

    /// No track with a `vide` handler exists.
    #[error("No video track found under {path}")]
    NoVideoTrack { path: BoxPath },
}

impl Error {
    /// Create a malformed container error.
    pub fn malformed(path: &BoxPath, offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedContainer {
            path: path.clone(),
            offset,
            reason: reason.into(),
        }
    }

    /// Create an unsupported variant error.
    pub fn unsupported(path: &BoxPath, offset: u64, detail: impl Into<String>) -> Self {
        Self::UnsupportedVariant {
            path: path.clone(),
            offset,
            detail: detail.into(),
        }
    }

    /// Create an inconsistent sample table error.
    pub fn inconsistent(path: &BoxPath, offset: u64, detail: impl Into<String>) -> Self {
        Self::SampleTableInconsistent {
            path: path.clone(),
            offset,
            detail: detail.into(),
        }
    }

    /// Path of the box at fault, when the error is tied to one.
    pub fn path(&self) -> Option<&BoxPath> {
        match self {
            Self::MalformedContainer { path, .. }
            | Self::TruncatedBox { path, .. }
            | Self::UnsupportedVariant { path, .. }
            | Self::MissingRequiredBox { path, .. }
            | Self::MissingSampleTable { path, .. }
            | Self::SampleTableInconsistent { path, .. }
            | Self::ShortSample { path, .. }
            | Self::NoVideoTrack { path } => Some(path),
            Self::Io { .. } => None,
        }
    }

    /// Absolute byte offset at fault, when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Io { offset, .. }
            | Self::MalformedContainer { offset, .. }
            | Self::TruncatedBox { offset, .. }
            | Self::UnsupportedVariant { offset, .. }
            | Self::MissingRequiredBox { offset, .. }
            | Self::MissingSampleTable { offset, .. }
            | Self::SampleTableInconsistent { offset, .. }
            | Self::ShortSample { offset, .. } => Some(*offset),
            Self::NoVideoTrack { .. } => None,
        }
    }
}
