//! Typed box payloads.
//!
//! Leaf boxes are decoded from their payload bytes here; container boxes
//! are assembled from already decoded children by the registry.

use super::payload::{FullBoxHeader, PayloadReader};
use super::{Fixed16_16, Fixed8_8, FourCC, Header, Mp4Box};
use crate::Result;

/// File type box (`ftyp`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FileTypeBox {
    pub header: Header,
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

impl FileTypeBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(8)?;
        let major_brand = r.fourcc()?;
        let minor_version = r.u32()?;

        let mut compatible_brands = Vec::with_capacity(r.remaining() / 4);
        while r.remaining() >= 4 {
            compatible_brands.push(r.fourcc()?);
        }
        if r.remaining() > 0 {
            tracing::debug!(
                "ftyp at {} has {} trailing bytes after its brand list",
                header.start,
                r.remaining()
            );
        }

        Ok(Self {
            header,
            major_brand,
            minor_version,
            compatible_brands,
        })
    }
}

/// Movie header box (`mvhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MovieHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    /// Time units per second.
    pub timescale: u32,
    /// Duration in timescale units.
    pub duration: u64,
    /// Preferred playback rate, 1.0 is normal.
    pub rate: Fixed16_16,
    /// Preferred volume, 1.0 is full.
    pub volume: Fixed8_8,
    pub matrix: [i32; 9],
    pub next_track_id: u32,
}

impl MovieHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        let full = r.full_box_header()?;
        let (creation_time, modification_time, timescale, duration) = match full.version {
            0 => {
                r.require(100)?;
                (r.u32()? as u64, r.u32()? as u64, r.u32()?, r.u32()? as u64)
            }
            1 => {
                r.require(112)?;
                (r.u64()?, r.u64()?, r.u32()?, r.u64()?)
            }
            v => return Err(r.unsupported(format!("version {v}"))),
        };
        let rate = Fixed16_16(r.u32()?);
        let volume = Fixed8_8(r.i16()?);
        r.skip(10)?;
        let matrix = read_matrix(r)?;
        r.skip(24)?;
        let next_track_id = r.u32()?;

        Ok(Self {
            header,
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.duration as f64 / self.timescale as f64
        }
    }
}

/// Track header box (`tkhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TrackHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: Fixed8_8,
    pub matrix: [i32; 9],
    pub width: Fixed16_16,
    pub height: Fixed16_16,
}

impl TrackHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        let full = r.full_box_header()?;
        let (creation_time, modification_time, track_id, duration) = match full.version {
            0 => {
                r.require(84)?;
                let creation = r.u32()? as u64;
                let modification = r.u32()? as u64;
                let track_id = r.u32()?;
                r.skip(4)?;
                (creation, modification, track_id, r.u32()? as u64)
            }
            1 => {
                r.require(96)?;
                let creation = r.u64()?;
                let modification = r.u64()?;
                let track_id = r.u32()?;
                r.skip(4)?;
                (creation, modification, track_id, r.u64()?)
            }
            v => return Err(r.unsupported(format!("version {v}"))),
        };
        r.skip(8)?;
        let layer = r.i16()?;
        let alternate_group = r.i16()?;
        let volume = Fixed8_8(r.i16()?);
        r.skip(2)?;
        let matrix = read_matrix(r)?;
        let width = Fixed16_16(r.u32()?);
        let height = Fixed16_16(r.u32()?);

        Ok(Self {
            header,
            full,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }

    /// Whether the track_enabled flag is set.
    pub fn is_enabled(&self) -> bool {
        self.full.flags & 0x1 != 0
    }
}

/// Media header box (`mdhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MediaHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// ISO 639-2/T code, `und` when unset or invalid.
    pub language: String,
}

impl MediaHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        let full = r.full_box_header()?;
        let (creation_time, modification_time, timescale, duration) = match full.version {
            0 => {
                r.require(24)?;
                (r.u32()? as u64, r.u32()? as u64, r.u32()?, r.u32()? as u64)
            }
            1 => {
                r.require(36)?;
                (r.u64()?, r.u64()?, r.u32()?, r.u64()?)
            }
            v => return Err(r.unsupported(format!("version {v}"))),
        };
        let language = decode_language(r.u16()?);
        r.skip(2)?;

        Ok(Self {
            header,
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }
}

/// Decode a packed ISO 639-2/T code: a pad bit, then three 5-bit letters offset by 0x60.
fn decode_language(packed: u16) -> String {
    let letters = [
        ((packed >> 10) & 0x1F) as u8 + 0x60,
        ((packed >> 5) & 0x1F) as u8 + 0x60,
        (packed & 0x1F) as u8 + 0x60,
    ];
    if letters.iter().all(u8::is_ascii_lowercase) {
        letters.iter().map(|&b| b as char).collect()
    } else {
        "und".to_string()
    }
}

/// Handler reference box (`hdlr`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct HandlerBox {
    pub header: Header,
    pub full: FullBoxHeader,
    /// Media handler, e.g. `vide` or `soun`.
    pub handler_type: FourCC,
    pub name: String,
}

impl HandlerBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(24)?;
        let full = r.full_box_header()?;
        r.skip(4)?;
        let handler_type = r.fourcc()?;
        r.skip(12)?;
        let raw_name = r.rest();
        let name_len = raw_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(raw_name.len());
        let name = String::from_utf8_lossy(&raw_name[..name_len]).into_owned();

        Ok(Self {
            header,
            full,
            handler_type,
            name,
        })
    }

    pub fn is_video(&self) -> bool {
        self.handler_type == FourCC::VIDE
    }
}

/// Video media header box (`vmhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct VideoMediaHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
}

impl VideoMediaHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(12)?;
        let full = r.full_box_header()?;
        let graphics_mode = r.u16()?;
        let opcolor = [r.u16()?, r.u16()?, r.u16()?];
        Ok(Self {
            header,
            full,
            graphics_mode,
            opcolor,
        })
    }
}

/// Sound media header box (`smhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SoundMediaHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    /// Stereo balance, -1.0 full left to 1.0 full right.
    pub balance: Fixed8_8,
}

impl SoundMediaHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(8)?;
        let full = r.full_box_header()?;
        let balance = Fixed8_8(r.i16()?);
        r.skip(2)?;
        Ok(Self {
            header,
            full,
            balance,
        })
    }
}

/// Hint media header box (`hmhd`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct HintMediaHeaderBox {
    pub header: Header,
    pub full: FullBoxHeader,
    pub max_pdu_size: u16,
    pub avg_pdu_size: u16,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
}

impl HintMediaHeaderBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(20)?;
        let full = r.full_box_header()?;
        let max_pdu_size = r.u16()?;
        let avg_pdu_size = r.u16()?;
        let max_bitrate = r.u32()?;
        let avg_bitrate = r.u32()?;
        r.skip(4)?;
        Ok(Self {
            header,
            full,
            max_pdu_size,
            avg_pdu_size,
            max_bitrate,
            avg_bitrate,
        })
    }
}

/// Sample size box (`stsz`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleSizeBox {
    pub header: Header,
    pub full: FullBoxHeader,
    /// Size shared by every sample, or 0 when `entry_sizes` lists them.
    pub sample_size: u32,
    pub sample_count: u32,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub entry_sizes: Vec<u32>,
}

impl SampleSizeBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(12)?;
        let full = r.full_box_header()?;
        let sample_size = r.u32()?;
        let sample_count = r.u32()?;

        let entry_sizes = if sample_size == 0 {
            r.require(12 + sample_count as u64 * 4)?;
            (0..sample_count)
                .map(|_| r.u32())
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            header,
            full,
            sample_size,
            sample_count,
            entry_sizes,
        })
    }

    /// Size of the sample at 0-based `index`.
    pub fn size_of(&self, index: u32) -> Option<u32> {
        if index >= self.sample_count {
            None
        } else if self.sample_size != 0 {
            Some(self.sample_size)
        } else {
            self.entry_sizes.get(index as usize).copied()
        }
    }
}

/// One run of chunks sharing a samples-per-chunk value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleToChunkEntry {
    /// 1-based index of the first chunk in the run.
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Sample-to-chunk box (`stsc`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleToChunkBox {
    pub header: Header,
    pub full: FullBoxHeader,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub entries: Vec<SampleToChunkEntry>,
}

impl SampleToChunkBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        r.require(8)?;
        let full = r.full_box_header()?;
        let entry_count = r.u32()?;
        r.require(8 + entry_count as u64 * 12)?;

        let entries = (0..entry_count)
            .map(|_| {
                Ok(SampleToChunkEntry {
                    first_chunk: r.u32()?,
                    samples_per_chunk: r.u32()?,
                    sample_description_index: r.u32()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            full,
            entries,
        })
    }
}

/// Chunk offset box, 32-bit (`stco`) or 64-bit (`co64`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ChunkOffsetBox {
    pub header: Header,
    pub full: FullBoxHeader,
    /// Absolute file offset of each chunk.
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub offsets: Vec<u64>,
}

impl ChunkOffsetBox {
    pub(crate) fn decode(header: Header, r: &mut PayloadReader<'_>) -> Result<Self> {
        let wide = header.box_type == FourCC::CO64;
        let entry_width: u64 = if wide { 8 } else { 4 };

        r.require(8)?;
        let full = r.full_box_header()?;
        let entry_count = r.u32()?;
        r.require(8 + entry_count as u64 * entry_width)?;

        let offsets = (0..entry_count)
            .map(|_| if wide { r.u64() } else { r.u32().map(u64::from) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            full,
            offsets,
        })
    }

    /// Whether offsets were stored as 64-bit values.
    pub fn is_wide(&self) -> bool {
        self.header.box_type == FourCC::CO64
    }
}

/// Media data box (`mdat`). Only its extent is recorded; the payload is
/// read sample by sample during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MediaDataBox {
    pub header: Header,
}

impl MediaDataBox {
    pub fn data_offset(&self) -> u64 {
        self.header.payload_offset()
    }

    pub fn data_len(&self) -> u64 {
        self.header.payload_len()
    }

    /// Whether `[offset, offset + length)` lies inside the payload.
    pub fn contains(&self, offset: u64, length: u64) -> bool {
        offset >= self.data_offset()
            && offset
                .checked_add(length)
                .is_some_and(|end| end <= self.header.end())
    }
}

/// Movie box (`moov`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MovieBox {
    pub header: Header,
    pub mvhd: MovieHeaderBox,
    pub tracks: Vec<TrackBox>,
    /// Children that are unknown or unexpected here.
    pub other: Vec<Mp4Box>,
}

/// Track box (`trak`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct TrackBox {
    pub header: Header,
    pub tkhd: Option<TrackHeaderBox>,
    pub mdia: MediaBox,
    pub other: Vec<Mp4Box>,
}

impl TrackBox {
    pub fn handler_type(&self) -> FourCC {
        self.mdia.hdlr.handler_type
    }

    pub fn is_video(&self) -> bool {
        self.mdia.hdlr.is_video()
    }

    pub fn track_id(&self) -> Option<u32> {
        self.tkhd.as_ref().map(|tkhd| tkhd.track_id)
    }

    pub fn sample_table(&self) -> &SampleTableBox {
        &self.mdia.minf.stbl
    }
}

/// Media box (`mdia`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MediaBox {
    pub header: Header,
    pub mdhd: Option<MediaHeaderBox>,
    pub hdlr: HandlerBox,
    pub minf: MediaInformationBox,
    pub other: Vec<Mp4Box>,
}

/// Media information box (`minf`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct MediaInformationBox {
    pub header: Header,
    pub vmhd: Option<VideoMediaHeaderBox>,
    pub smhd: Option<SoundMediaHeaderBox>,
    pub hmhd: Option<HintMediaHeaderBox>,
    pub stbl: SampleTableBox,
    pub other: Vec<Mp4Box>,
}

/// Sample table box (`stbl`). The three tables needed to locate samples
/// are optional here; their absence only matters when the track is
/// extracted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SampleTableBox {
    pub header: Header,
    pub stsz: Option<SampleSizeBox>,
    pub stsc: Option<SampleToChunkBox>,
    /// `stco` or `co64`.
    pub chunk_offsets: Option<ChunkOffsetBox>,
    pub other: Vec<Mp4Box>,
}

/// Read a 3x3 transformation matrix.
fn read_matrix(r: &mut PayloadReader<'_>) -> Result<[i32; 9]> {
    let mut matrix = [0i32; 9];
    for value in &mut matrix {
        *value = r.i32()?;
    }
    Ok(matrix)
}
