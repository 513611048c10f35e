//! Tag-keyed dispatch from box headers to typed decoders.

use super::boxes::*;
use super::payload::PayloadReader;
use super::scanner::BoxScanner;
use super::{BoxPath, FourCC, Header};
use crate::source::ByteSource;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;
/// Default maximum number of boxes visited in one parse.
pub const DEFAULT_MAX_BOXES: usize = 1_000_000;
/// Default maximum size of a leaf payload read into memory (256 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Work budget for one parse.
///
/// Nesting, the number of boxes visited and the size of any payload read
/// into memory are all bounded; exceeding one fails the parse with
/// [`Error::MalformedContainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_depth: usize,
    pub max_boxes: usize,
    pub max_payload_bytes: u64,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_boxes: DEFAULT_MAX_BOXES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl ParseLimits {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_boxes(mut self, max_boxes: usize) -> Self {
        self.max_boxes = max_boxes;
        self
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: u64) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }
}

/// A decoded box.
///
/// Every variant carries the common [`Header`]; tags without a decoder are
/// kept as [`Mp4Box::Unknown`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "serialize", serde(tag = "type", rename_all = "lowercase"))]
pub enum Mp4Box {
    Ftyp(FileTypeBox),
    Moov(MovieBox),
    Mvhd(MovieHeaderBox),
    Trak(TrackBox),
    Tkhd(TrackHeaderBox),
    Mdia(MediaBox),
    Mdhd(MediaHeaderBox),
    Hdlr(HandlerBox),
    Minf(MediaInformationBox),
    Vmhd(VideoMediaHeaderBox),
    Smhd(SoundMediaHeaderBox),
    Hmhd(HintMediaHeaderBox),
    Stbl(SampleTableBox),
    Stsz(SampleSizeBox),
    Stsc(SampleToChunkBox),
    /// `stco` or `co64`.
    ChunkOffsets(ChunkOffsetBox),
    Mdat(MediaDataBox),
    Unknown(Header),
}

impl Mp4Box {
    pub fn header(&self) -> &Header {
        match self {
            Self::Ftyp(b) => &b.header,
            Self::Moov(b) => &b.header,
            Self::Mvhd(b) => &b.header,
            Self::Trak(b) => &b.header,
            Self::Tkhd(b) => &b.header,
            Self::Mdia(b) => &b.header,
            Self::Mdhd(b) => &b.header,
            Self::Hdlr(b) => &b.header,
            Self::Minf(b) => &b.header,
            Self::Vmhd(b) => &b.header,
            Self::Smhd(b) => &b.header,
            Self::Hmhd(b) => &b.header,
            Self::Stbl(b) => &b.header,
            Self::Stsz(b) => &b.header,
            Self::Stsc(b) => &b.header,
            Self::ChunkOffsets(b) => &b.header,
            Self::Mdat(b) => &b.header,
            Self::Unknown(header) => header,
        }
    }

    pub fn box_type(&self) -> FourCC {
        self.header().box_type
    }
}

/// Whether `box_type` has a typed decoder.
pub fn is_known(box_type: FourCC) -> bool {
    matches!(
        box_type,
        FourCC::FTYP
            | FourCC::MOOV
            | FourCC::MVHD
            | FourCC::TRAK
            | FourCC::TKHD
            | FourCC::MDIA
            | FourCC::MDHD
            | FourCC::HDLR
            | FourCC::MINF
            | FourCC::VMHD
            | FourCC::SMHD
            | FourCC::HMHD
            | FourCC::STBL
            | FourCC::STSZ
            | FourCC::STSC
            | FourCC::STCO
            | FourCC::CO64
            | FourCC::MDAT
    )
}

/// Boxes whose decode failure is logged and tolerated.
fn is_optional(box_type: FourCC) -> bool {
    matches!(
        box_type,
        FourCC::TKHD | FourCC::MDHD | FourCC::VMHD | FourCC::SMHD | FourCC::HMHD
    )
}

/// Decode the box described by `header`, a child of `parent`, recursing
/// into container boxes.
pub fn decode_box<S: ByteSource + ?Sized>(
    source: &S,
    header: Header,
    parent: &BoxPath,
    limits: &ParseLimits,
) -> Result<Mp4Box> {
    BoxDecoder::new(source, limits).decode(header, parent)
}

/// Recursive decoder carrying the work budget across one parse.
pub(crate) struct BoxDecoder<'a, S: ?Sized> {
    source: &'a S,
    limits: &'a ParseLimits,
    visited: usize,
}

impl<'a, S: ByteSource + ?Sized> BoxDecoder<'a, S> {
    pub(crate) fn new(source: &'a S, limits: &'a ParseLimits) -> Self {
        Self {
            source,
            limits,
            visited: 0,
        }
    }

    pub(crate) fn decode(&mut self, header: Header, parent: &BoxPath) -> Result<Mp4Box> {
        let path = parent.child(header.box_type);

        self.visited += 1;
        if self.visited > self.limits.max_boxes {
            return Err(Error::malformed(
                &path,
                header.start,
                format!("more than {} boxes in one file", self.limits.max_boxes),
            ));
        }
        if path.depth() > self.limits.max_depth {
            return Err(Error::malformed(
                &path,
                header.start,
                format!("nesting deeper than {} levels", self.limits.max_depth),
            ));
        }

        debug!("{} at offset {} ({} bytes)", path, header.start, header.size);

        // Budget violations are fatal even for boxes that may be downgraded.
        if is_optional(header.box_type) {
            self.check_payload(&header, &path)?;
        }

        let decoded = match header.box_type {
            FourCC::MOOV => self.movie(header, &path).map(Mp4Box::Moov),
            FourCC::TRAK => self.track(header, &path).map(Mp4Box::Trak),
            FourCC::MDIA => self.media(header, &path).map(Mp4Box::Mdia),
            FourCC::MINF => self.media_information(header, &path).map(Mp4Box::Minf),
            FourCC::STBL => self.sample_table(header, &path).map(Mp4Box::Stbl),
            FourCC::MDAT => Ok(Mp4Box::Mdat(MediaDataBox { header })),
            FourCC::FTYP => self.leaf(header, &path, FileTypeBox::decode).map(Mp4Box::Ftyp),
            FourCC::MVHD => self.leaf(header, &path, MovieHeaderBox::decode).map(Mp4Box::Mvhd),
            FourCC::TKHD => self.leaf(header, &path, TrackHeaderBox::decode).map(Mp4Box::Tkhd),
            FourCC::MDHD => self.leaf(header, &path, MediaHeaderBox::decode).map(Mp4Box::Mdhd),
            FourCC::HDLR => self.leaf(header, &path, HandlerBox::decode).map(Mp4Box::Hdlr),
            FourCC::VMHD => self
                .leaf(header, &path, VideoMediaHeaderBox::decode)
                .map(Mp4Box::Vmhd),
            FourCC::SMHD => self
                .leaf(header, &path, SoundMediaHeaderBox::decode)
                .map(Mp4Box::Smhd),
            FourCC::HMHD => self
                .leaf(header, &path, HintMediaHeaderBox::decode)
                .map(Mp4Box::Hmhd),
            FourCC::STSZ => self.leaf(header, &path, SampleSizeBox::decode).map(Mp4Box::Stsz),
            FourCC::STSC => self
                .leaf(header, &path, SampleToChunkBox::decode)
                .map(Mp4Box::Stsc),
            FourCC::STCO | FourCC::CO64 => self
                .leaf(header, &path, ChunkOffsetBox::decode)
                .map(Mp4Box::ChunkOffsets),
            FourCC::STZ2 => Err(Error::unsupported(
                &path,
                header.start,
                "compact sample sizes (stz2) are not supported",
            )),
            _ => Ok(Mp4Box::Unknown(header)),
        };

        match decoded {
            Err(e) if is_optional(header.box_type) && !matches!(e, Error::Io { .. }) => {
                warn!("Keeping {} as an opaque box: {}", path, e);
                Ok(Mp4Box::Unknown(header))
            }
            other => other,
        }
    }

    fn check_payload(&self, header: &Header, path: &BoxPath) -> Result<()> {
        let len = header.payload_len();
        if len > self.limits.max_payload_bytes {
            return Err(Error::malformed(
                path,
                header.start,
                format!(
                    "payload of {} bytes exceeds the {} byte limit",
                    len, self.limits.max_payload_bytes
                ),
            ));
        }
        Ok(())
    }

    /// Read a leaf payload and run its decoder.
    fn leaf<T>(
        &self,
        header: Header,
        path: &BoxPath,
        decode: fn(Header, &mut PayloadReader<'_>) -> Result<T>,
    ) -> Result<T> {
        self.check_payload(&header, path)?;
        let data = self.source.read_at(header.payload_offset(), header.payload_len())?;
        let mut reader = PayloadReader::new(&data, &header, path);
        decode(header, &mut reader)
    }

    /// Decode every child in the payload of a container box, in file order.
    fn children(&mut self, header: &Header, path: &BoxPath) -> Result<Vec<Mp4Box>> {
        let scanner = BoxScanner::new(
            self.source,
            header.payload_offset(),
            header.payload_len(),
            path.clone(),
        );
        let mut children = Vec::new();
        for child in scanner {
            children.push(self.decode(child?, path)?);
        }
        Ok(children)
    }

    fn movie(&mut self, header: Header, path: &BoxPath) -> Result<MovieBox> {
        let mut mvhd = None;
        let mut tracks = Vec::new();
        let mut other = Vec::new();

        for child in self.children(&header, path)? {
            match child {
                Mp4Box::Mvhd(b) if mvhd.is_none() => mvhd = Some(b),
                Mp4Box::Trak(b) => tracks.push(b),
                child => other.push(child),
            }
        }

        let mvhd = mvhd.ok_or_else(|| missing(path, FourCC::MVHD, &header))?;
        if tracks.is_empty() {
            return Err(missing(path, FourCC::TRAK, &header));
        }
        debug!("moov holds {} tracks", tracks.len());

        Ok(MovieBox {
            header,
            mvhd,
            tracks,
            other,
        })
    }

    fn track(&mut self, header: Header, path: &BoxPath) -> Result<TrackBox> {
        let mut tkhd = None;
        let mut mdia = None;
        let mut other = Vec::new();

        for child in self.children(&header, path)? {
            match child {
                Mp4Box::Tkhd(b) if tkhd.is_none() => tkhd = Some(b),
                Mp4Box::Mdia(b) if mdia.is_none() => mdia = Some(b),
                child => other.push(child),
            }
        }

        let mdia = mdia.ok_or_else(|| missing(path, FourCC::MDIA, &header))?;
        debug!(
            "Track {:?} at offset {} has handler {}",
            tkhd.as_ref().map(|t| t.track_id),
            header.start,
            mdia.hdlr.handler_type
        );

        Ok(TrackBox {
            header,
            tkhd,
            mdia,
            other,
        })
    }

    fn media(&mut self, header: Header, path: &BoxPath) -> Result<MediaBox> {
        let mut mdhd = None;
        let mut hdlr = None;
        let mut minf = None;
        let mut other = Vec::new();

        for child in self.children(&header, path)? {
            match child {
                Mp4Box::Mdhd(b) if mdhd.is_none() => mdhd = Some(b),
                Mp4Box::Hdlr(b) if hdlr.is_none() => hdlr = Some(b),
                Mp4Box::Minf(b) if minf.is_none() => minf = Some(b),
                child => other.push(child),
            }
        }

        Ok(MediaBox {
            hdlr: hdlr.ok_or_else(|| missing(path, FourCC::HDLR, &header))?,
            minf: minf.ok_or_else(|| missing(path, FourCC::MINF, &header))?,
            header,
            mdhd,
            other,
        })
    }

    fn media_information(
        &mut self,
        header: Header,
        path: &BoxPath,
    ) -> Result<MediaInformationBox> {
        let mut vmhd = None;
        let mut smhd = None;
        let mut hmhd = None;
        let mut stbl = None;
        let mut other = Vec::new();

        for child in self.children(&header, path)? {
            match child {
                Mp4Box::Vmhd(b) if vmhd.is_none() => vmhd = Some(b),
                Mp4Box::Smhd(b) if smhd.is_none() => smhd = Some(b),
                Mp4Box::Hmhd(b) if hmhd.is_none() => hmhd = Some(b),
                Mp4Box::Stbl(b) if stbl.is_none() => stbl = Some(b),
                child => other.push(child),
            }
        }

        Ok(MediaInformationBox {
            stbl: stbl.ok_or_else(|| missing(path, FourCC::STBL, &header))?,
            header,
            vmhd,
            smhd,
            hmhd,
            other,
        })
    }

    fn sample_table(&mut self, header: Header, path: &BoxPath) -> Result<SampleTableBox> {
        let mut stsz = None;
        let mut stsc = None;
        let mut chunk_offsets = None;
        let mut other = Vec::new();

        for child in self.children(&header, path)? {
            match child {
                Mp4Box::Stsz(b) if stsz.is_none() => stsz = Some(b),
                Mp4Box::Stsc(b) if stsc.is_none() => stsc = Some(b),
                Mp4Box::ChunkOffsets(b) if chunk_offsets.is_none() => chunk_offsets = Some(b),
                child => other.push(child),
            }
        }

        Ok(SampleTableBox {
            header,
            stsz,
            stsc,
            chunk_offsets,
            other,
        })
    }
}

fn missing(parent: &BoxPath, box_type: FourCC, parent_header: &Header) -> Error {
    Error::MissingRequiredBox {
        path: parent.child(box_type),
        offset: parent_header.start,
    }
}
