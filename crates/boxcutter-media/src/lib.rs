//! Boxcutter-Media: ISO-BMFF box trees, sample tables and Annex-B extraction
//!
//! This crate reads MP4-family containers through a random-access
//! [`ByteSource`], decodes the box tree into typed values and rewrites the
//! first video track into an Annex-B (start code delimited) elementary
//! stream.
//!
//! # Modules
//!
//! - `source` - Random-access byte sources (memory, files)
//! - `mp4` - Box scanning, typed box decoders, sample table resolution
//! - `annexb` - Length-prefixed to start-code NAL unit rewriting
//!
//! # Pipeline
//!
//! 1. Scan top-level boxes and decode `ftyp`, `moov` and the `mdat` regions
//! 2. Select the first track whose handler is `vide`
//! 3. Resolve sample offsets and sizes from stsz/stsc/stco
//! 4. Read each sample and replace its 4-byte NAL length prefixes with
//!    `00 00 00 01`

pub mod annexb;
pub mod error;
pub mod mp4;
pub mod source;

pub use annexb::{ExtractPolicy, Extraction, SkippedSample};
pub use error::{Error, Result};
pub use mp4::{BoxPath, Mp4File, ParseLimits};
pub use source::{ByteSource, FileSource};

/// Options for [`extract_annexb`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub limits: ParseLimits,
    pub policy: ExtractPolicy,
}

/// Parse `source` and extract its first video track as an Annex-B stream.
pub fn extract_annexb<S: ByteSource + ?Sized>(
    source: &S,
    options: &ExtractOptions,
) -> Result<Extraction> {
    Mp4File::parse_with_limits(source, &options.limits)?.extract_video(source, options.policy)
}
