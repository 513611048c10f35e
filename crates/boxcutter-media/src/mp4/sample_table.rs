//! Sample location tables.
//!
//! Three tables inside `stbl` together locate every sample of a track:
//! - stsz: sample sizes
//! - stsc: sample-to-chunk runs
//! - stco/co64: chunk offsets
//!
//! [`SampleTableBuilder`] combines them into an ordered list of absolute
//! `(offset, length)` pairs and rejects tables that disagree.

use super::boxes::{SampleTableBox, SampleToChunkEntry};
use super::{BoxPath, FourCC};
use crate::{Error, Result};
use tracing::debug;

/// A resolved sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Sample index (0-based).
    pub index: u32,
    /// Absolute file offset of the first byte.
    pub offset: u64,
    /// Sample size in bytes.
    pub length: u32,
}

impl Sample {
    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length as u64)
    }
}

/// Samples of one track in decode order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleTable {
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get sample by index.
    pub fn get(&self, index: u32) -> Option<&Sample> {
        self.samples.get(index as usize)
    }

    /// Iterate over all samples.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Sum of all sample sizes.
    pub fn total_bytes(&self) -> u64 {
        self.samples.iter().map(|s| s.length as u64).sum()
    }
}

impl<'a> IntoIterator for &'a SampleTable {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Combines the raw stsz, stsc and chunk offset tables of one `stbl`.
///
/// All state is local to the builder; `build` consumes it.
#[derive(Debug, Clone)]
pub struct SampleTableBuilder<'a> {
    path: BoxPath,
    offset: u64,
    uniform_size: u32,
    sample_count: u32,
    sample_sizes: &'a [u32],
    stsc_entries: &'a [SampleToChunkEntry],
    chunk_offsets: &'a [u64],
    offsets_type: FourCC,
    media_data_len: Option<u64>,
}

impl<'a> SampleTableBuilder<'a> {
    /// Create an empty builder for the `stbl` at `path`, starting at `offset`.
    pub fn new(path: BoxPath, offset: u64) -> Self {
        Self {
            path,
            offset,
            uniform_size: 0,
            sample_count: 0,
            sample_sizes: &[],
            stsc_entries: &[],
            chunk_offsets: &[],
            offsets_type: FourCC::STCO,
            media_data_len: None,
        }
    }

    /// Load all three tables from a decoded `stbl`.
    ///
    /// Fails with [`Error::MissingSampleTable`] naming the first absent table.
    pub fn from_box(stbl: &'a SampleTableBox, path: BoxPath) -> Result<Self> {
        let missing = |box_type: FourCC| Error::MissingSampleTable {
            path: path.child(box_type),
            offset: stbl.header.start,
        };
        let stsz = stbl.stsz.as_ref().ok_or_else(|| missing(FourCC::STSZ))?;
        let stsc = stbl.stsc.as_ref().ok_or_else(|| missing(FourCC::STSC))?;
        let stco = stbl
            .chunk_offsets
            .as_ref()
            .ok_or_else(|| missing(FourCC::STCO))?;

        let mut builder = Self::new(path, stbl.header.start);
        builder.set_stsz(stsz.sample_size, stsz.sample_count, &stsz.entry_sizes);
        builder.set_stsc(&stsc.entries);
        builder.set_chunk_offsets(&stco.offsets);
        builder.offsets_type = stco.header.box_type;
        Ok(builder)
    }

    /// Set stsz data. With a non-zero `uniform_size`, `sizes` is ignored.
    pub fn set_stsz(&mut self, uniform_size: u32, sample_count: u32, sizes: &'a [u32]) {
        self.uniform_size = uniform_size;
        self.sample_count = sample_count;
        self.sample_sizes = sizes;
    }

    /// Set stsc entries.
    pub fn set_stsc(&mut self, entries: &'a [SampleToChunkEntry]) {
        self.stsc_entries = entries;
    }

    /// Set chunk offsets (from stco or co64).
    pub fn set_chunk_offsets(&mut self, offsets: &'a [u64]) {
        self.chunk_offsets = offsets;
    }

    /// Bound the summed sample sizes by the bytes of media data available.
    pub fn set_media_data_len(&mut self, len: u64) {
        self.media_data_len = Some(len);
    }

    /// Resolve every sample's absolute offset and length.
    ///
    /// The table sizes are cross-checked before anything is allocated.
    pub fn build(self) -> Result<SampleTable> {
        self.check_sizes()?;
        self.check_chunk_offsets()?;
        self.check_stsc()?;
        self.check_sample_count()?;
        self.check_total_bytes()?;

        let mut samples = Vec::with_capacity(self.sample_count as usize);
        let chunk_count = self.chunk_offsets.len() as u64;

        for (i, entry) in self.stsc_entries.iter().enumerate() {
            let next_first = self
                .stsc_entries
                .get(i + 1)
                .map_or(chunk_count + 1, |next| next.first_chunk as u64);

            for chunk in entry.first_chunk as u64..next_first {
                let base = self.chunk_offsets[(chunk - 1) as usize];
                let mut offset = base;

                for _ in 0..entry.samples_per_chunk {
                    let index = samples.len() as u32;
                    let length = self.size_of(index);
                    samples.push(Sample {
                        index,
                        offset,
                        length,
                    });
                    offset = offset.checked_add(length as u64).ok_or_else(|| {
                        self.error(
                            FourCC::STSZ,
                            format!("sample {index} in chunk {chunk} overflows a 64-bit offset"),
                        )
                    })?;
                }
            }
        }

        debug!(
            "Resolved {} samples in {} chunks for {}",
            samples.len(),
            chunk_count,
            self.path
        );
        Ok(SampleTable { samples })
    }

    fn size_of(&self, index: u32) -> u32 {
        if self.uniform_size != 0 {
            self.uniform_size
        } else {
            self.sample_sizes[index as usize]
        }
    }

    fn check_sizes(&self) -> Result<()> {
        if self.uniform_size == 0 && self.sample_sizes.len() != self.sample_count as usize {
            return Err(self.error(
                FourCC::STSZ,
                format!(
                    "{} sample sizes listed for {} samples",
                    self.sample_sizes.len(),
                    self.sample_count
                ),
            ));
        }
        Ok(())
    }

    fn check_chunk_offsets(&self) -> Result<()> {
        if let Some(pos) = self
            .chunk_offsets
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(self.error(
                self.offsets_type,
                format!(
                    "chunk {} offset {} does not follow chunk {} offset {}",
                    pos + 2,
                    self.chunk_offsets[pos + 1],
                    pos + 1,
                    self.chunk_offsets[pos]
                ),
            ));
        }
        Ok(())
    }

    fn check_stsc(&self) -> Result<()> {
        let chunk_count = self.chunk_offsets.len() as u64;

        if let Some(first) = self.stsc_entries.first() {
            if first.first_chunk != 1 {
                return Err(self.error(
                    FourCC::STSC,
                    format!("first entry starts at chunk {}, not 1", first.first_chunk),
                ));
            }
        }
        if let Some(pair) = self
            .stsc_entries
            .windows(2)
            .find(|pair| pair[1].first_chunk <= pair[0].first_chunk)
        {
            return Err(self.error(
                FourCC::STSC,
                format!(
                    "first_chunk {} does not follow {}",
                    pair[1].first_chunk, pair[0].first_chunk
                ),
            ));
        }
        if let Some(entry) = self
            .stsc_entries
            .iter()
            .find(|entry| entry.first_chunk as u64 > chunk_count)
        {
            return Err(self.error(
                FourCC::STSC,
                format!(
                    "entry starts at chunk {} but only {} chunks exist",
                    entry.first_chunk, chunk_count
                ),
            ));
        }
        Ok(())
    }

    /// Samples implied by the chunk runs must equal the stsz count.
    fn check_sample_count(&self) -> Result<()> {
        let chunk_count = self.chunk_offsets.len() as u64;
        let mut implied = 0u64;

        for (i, entry) in self.stsc_entries.iter().enumerate() {
            let next_first = self
                .stsc_entries
                .get(i + 1)
                .map_or(chunk_count + 1, |next| next.first_chunk as u64);
            let run = next_first - entry.first_chunk as u64;
            implied = run
                .checked_mul(entry.samples_per_chunk as u64)
                .and_then(|n| implied.checked_add(n))
                .ok_or_else(|| {
                    self.error(FourCC::STSC, "sample count of the chunk runs overflows")
                })?;
        }

        if implied != self.sample_count as u64 {
            return Err(self.error(
                FourCC::STSC,
                format!(
                    "chunks hold {} samples but stsz declares {}",
                    implied, self.sample_count
                ),
            ));
        }
        Ok(())
    }

    fn check_total_bytes(&self) -> Result<()> {
        let Some(available) = self.media_data_len else {
            return Ok(());
        };
        let total = if self.uniform_size != 0 {
            self.uniform_size as u64 * self.sample_count as u64
        } else {
            self.sample_sizes.iter().map(|&s| s as u64).sum()
        };
        if total > available {
            return Err(self.error(
                FourCC::STSZ,
                format!("samples total {total} bytes but media data holds {available}"),
            ));
        }
        Ok(())
    }

    fn error(&self, table: FourCC, detail: impl Into<String>) -> Error {
        Error::inconsistent(&self.path.child(table), self.offset, detail)
    }
}
