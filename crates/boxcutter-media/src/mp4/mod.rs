//! ISO-BMFF (MP4) container parsing.
//!
//! The file is read as a tree of boxes: [`scan`] enumerates sibling
//! headers, the registry decodes known tags into typed boxes and
//! [`Mp4File`] assembles the top level. Sample locations of a track are
//! resolved on demand by [`SampleTableBuilder`].

mod atoms;
mod boxes;
mod fixed;
mod payload;
mod registry;
mod sample_table;
pub mod scanner;

pub use atoms::{BoxPath, FourCC, Header};
pub use boxes::{
    ChunkOffsetBox, FileTypeBox, HandlerBox, HintMediaHeaderBox, MediaBox, MediaDataBox,
    MediaHeaderBox, MediaInformationBox, MovieBox, MovieHeaderBox, SampleSizeBox,
    SampleTableBox, SampleToChunkBox, SampleToChunkEntry, SoundMediaHeaderBox, TrackBox,
    TrackHeaderBox, VideoMediaHeaderBox,
};
pub use fixed::{Fixed16_16, Fixed8_8};
pub use payload::FullBoxHeader;
pub use registry::{
    decode_box, is_known, Mp4Box, ParseLimits, DEFAULT_MAX_BOXES, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_PAYLOAD_BYTES,
};
pub use sample_table::{Sample, SampleTable, SampleTableBuilder};
pub use scanner::{scan, BoxScanner};

use crate::annexb::{self, ExtractPolicy, Extraction};
use crate::source::ByteSource;
use crate::{Error, Result};
use registry::BoxDecoder;
use tracing::{debug, info};

/// A parsed MP4 file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Mp4File {
    /// Total size of the source in bytes.
    pub size: u64,
    pub ftyp: FileTypeBox,
    pub moov: MovieBox,
    /// Media data regions in file order.
    pub mdat: Vec<MediaDataBox>,
    /// Other top-level boxes (free, skip, udta, ...).
    pub other: Vec<Mp4Box>,
}

impl Mp4File {
    /// Parse with the default [`ParseLimits`].
    pub fn parse<S: ByteSource + ?Sized>(source: &S) -> Result<Self> {
        Self::parse_with_limits(source, &ParseLimits::default())
    }

    /// Parse the whole box tree of `source`.
    ///
    /// Fails if `ftyp` or `moov` is missing or repeated, if a mandatory
    /// box below `moov` is absent, or if any known box fails to decode
    /// (apart from the optional header boxes, which are kept opaque).
    pub fn parse_with_limits<S: ByteSource + ?Sized>(
        source: &S,
        limits: &ParseLimits,
    ) -> Result<Self> {
        let size = source.size().map_err(|source| Error::Io {
            offset: 0,
            length: 0,
            source,
        })?;

        let root = BoxPath::root();
        let mut decoder = BoxDecoder::new(source, limits);
        let mut ftyp = None;
        let mut moov = None;
        let mut mdat = Vec::new();
        let mut other = Vec::new();

        for header in scan(source, 0, size) {
            let header = header?;
            match decoder.decode(header, &root)? {
                Mp4Box::Ftyp(b) => set_once(&mut ftyp, b, &header)?,
                Mp4Box::Moov(b) => set_once(&mut moov, b, &header)?,
                Mp4Box::Mdat(b) => mdat.push(b),
                b => other.push(b),
            }
        }

        let missing = |box_type: FourCC| Error::MissingRequiredBox {
            path: root.child(box_type),
            offset: 0,
        };
        let ftyp = ftyp.ok_or_else(|| missing(FourCC::FTYP))?;
        let moov = moov.ok_or_else(|| missing(FourCC::MOOV))?;

        info!(
            "Parsed {} ({} bytes): {} tracks, {} mdat boxes",
            ftyp.major_brand,
            size,
            moov.tracks.len(),
            mdat.len()
        );

        Ok(Self {
            size,
            ftyp,
            moov,
            mdat,
            other,
        })
    }

    pub fn tracks(&self) -> &[TrackBox] {
        &self.moov.tracks
    }

    /// The first track with a `vide` handler, in file order.
    pub fn video_track(&self) -> Option<&TrackBox> {
        self.moov.tracks.iter().find(|t| t.is_video())
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.moov.mvhd.duration_secs()
    }

    /// Whether `moov` precedes the first `mdat`.
    pub fn has_faststart(&self) -> bool {
        match self.mdat.first() {
            Some(mdat) => self.moov.header.start < mdat.header.start,
            None => true,
        }
    }

    /// Resolve the samples of the selected video track and check that each
    /// one lies inside a media data region.
    pub fn video_samples(&self) -> Result<SampleTable> {
        let track = self.video_track().ok_or_else(|| Error::NoVideoTrack {
            path: BoxPath::root().child(FourCC::MOOV),
        })?;
        debug!(
            "Selected video track {:?} at offset {}",
            track.track_id(),
            track.header.start
        );

        if self.mdat.is_empty() {
            return Err(Error::MissingRequiredBox {
                path: BoxPath::root().child(FourCC::MDAT),
                offset: 0,
            });
        }

        let media_data_len = self
            .mdat
            .iter()
            .fold(0u64, |total, m| total.saturating_add(m.data_len()));
        let samples = track.samples(media_data_len)?;
        if let Some(sample) = samples
            .iter()
            .find(|s| !self.mdat.iter().any(|m| m.contains(s.offset, s.length as u64)))
        {
            return Err(Error::inconsistent(
                &sample_table_path(),
                track.sample_table().header.start,
                format!(
                    "sample {} at offset {} ({} bytes) lies outside every mdat",
                    sample.index, sample.offset, sample.length
                ),
            ));
        }
        Ok(samples)
    }

    /// Rewrite the selected video track into an Annex-B stream.
    ///
    /// `source` must be the source this file was parsed from.
    pub fn extract_video<S: ByteSource + ?Sized>(
        &self,
        source: &S,
        policy: ExtractPolicy,
    ) -> Result<Extraction> {
        let samples = self.video_samples()?;
        annexb::extract(source, &samples, policy)
    }
}

impl TrackBox {
    /// Resolve the absolute location of every sample in this track whose
    /// sizes sum to at most `media_data_len` bytes.
    pub fn samples(&self, media_data_len: u64) -> Result<SampleTable> {
        let mut builder = SampleTableBuilder::from_box(self.sample_table(), sample_table_path())?;
        builder.set_media_data_len(media_data_len);
        builder.build()
    }
}

/// Path of a track's `stbl`, fixed by the typed tree.
fn sample_table_path() -> BoxPath {
    BoxPath::from(
        &[
            FourCC::MOOV,
            FourCC::TRAK,
            FourCC::MDIA,
            FourCC::MINF,
            FourCC::STBL,
        ][..],
    )
}

fn set_once<T>(slot: &mut Option<T>, value: T, header: &Header) -> Result<()> {
    if slot.is_some() {
        return Err(Error::malformed(
            &BoxPath::root().child(header.box_type),
            header.start,
            format!("duplicate top-level {} box", header.box_type),
        ));
    }
    *slot = Some(value);
    Ok(())
}
