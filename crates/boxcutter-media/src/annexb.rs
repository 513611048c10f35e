//! Annex-B elementary stream output.
//!
//! Samples stored in MP4 carry NAL units behind 4-byte big-endian length
//! prefixes. Rewriting replaces each prefix with the `00 00 00 01` start
//! code; the unit bytes themselves are copied untouched.

use crate::mp4::{BoxPath, FourCC, SampleTable};
use crate::source::ByteSource;
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{info, warn};

/// Annex-B start code.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];
/// Width of the NAL unit length prefix inside a sample.
pub const NAL_LENGTH_SIZE: usize = 4;

/// What to do with a sample whose NAL layout is broken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ExtractPolicy {
    /// Fail the whole extraction; no output is produced.
    #[default]
    Abort,
    /// Leave the sample out, keep going and report it.
    BestEffort,
}

/// A sample left out under [`ExtractPolicy::BestEffort`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SkippedSample {
    pub index: u32,
    pub offset: u64,
    pub length: u32,
    pub reason: String,
}

/// Result of an extraction.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The Annex-B byte stream.
    pub stream: Bytes,
    pub samples_written: u32,
    pub nal_units: u64,
    pub skipped: Vec<SkippedSample>,
}

/// A NAL length prefix, or the unit it declares, runs past the end of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("NAL unit at byte {position} declares {declared} bytes, {remaining} remain")]
pub struct NalLengthError {
    /// Byte position of the offending prefix within the sample.
    pub position: usize,
    /// Bytes the prefix needs: the declared unit length, or the prefix width
    /// itself when the prefix is cut short.
    pub declared: u64,
    /// Bytes left in the sample after `position` (after the prefix for a
    /// complete one).
    pub remaining: usize,
}

/// Append the Annex-B form of one length-prefixed sample to `out`.
///
/// Returns the number of NAL units written. On error `out` is left as it
/// was, so a broken sample never leaves partial output behind.
pub fn rewrite_sample(
    sample: &[u8],
    out: &mut BytesMut,
) -> std::result::Result<usize, NalLengthError> {
    let start_len = out.len();
    let mut pos = 0usize;
    let mut units = 0usize;

    while pos < sample.len() {
        let remaining = sample.len() - pos;
        if remaining < NAL_LENGTH_SIZE {
            out.truncate(start_len);
            return Err(NalLengthError {
                position: pos,
                declared: NAL_LENGTH_SIZE as u64,
                remaining,
            });
        }

        let declared = u32::from_be_bytes([
            sample[pos],
            sample[pos + 1],
            sample[pos + 2],
            sample[pos + 3],
        ]) as usize;
        let body = pos + NAL_LENGTH_SIZE;
        let remaining = sample.len() - body;
        if declared > remaining {
            out.truncate(start_len);
            return Err(NalLengthError {
                position: pos,
                declared: declared as u64,
                remaining,
            });
        }

        out.put_slice(&START_CODE);
        out.put_slice(&sample[body..body + declared]);
        units += 1;
        pos = body + declared;
    }

    Ok(units)
}

/// Read every sample of `samples` from `source` and concatenate their
/// Annex-B forms.
///
/// Read failures abort under either policy.
pub fn extract<S: ByteSource + ?Sized>(
    source: &S,
    samples: &SampleTable,
    policy: ExtractPolicy,
) -> Result<Extraction> {
    let mut out = BytesMut::new();
    let mut samples_written = 0u32;
    let mut nal_units = 0u64;
    let mut skipped = Vec::new();

    for sample in samples {
        let data = source.read_at(sample.offset, sample.length as u64)?;
        match rewrite_sample(&data, &mut out) {
            Ok(units) => {
                samples_written += 1;
                nal_units += units as u64;
            }
            Err(e) => {
                let err = Error::ShortSample {
                    path: BoxPath::root().child(FourCC::MDAT),
                    index: sample.index,
                    offset: sample.offset,
                    position: e.position,
                    declared: e.declared,
                    remaining: e.remaining,
                };
                if policy == ExtractPolicy::Abort {
                    return Err(err);
                }
                warn!("Skipping sample: {}", err);
                skipped.push(SkippedSample {
                    index: sample.index,
                    offset: sample.offset,
                    length: sample.length,
                    reason: err.to_string(),
                });
            }
        }
    }

    info!(
        "Extracted {} samples ({} NAL units, {} bytes), skipped {}",
        samples_written,
        nal_units,
        out.len(),
        skipped.len()
    );

    Ok(Extraction {
        stream: out.freeze(),
        samples_written,
        nal_units,
        skipped,
    })
}
