//! Box type codes, headers and tree paths.

use std::fmt;

/// Four-character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const FTYP: Self = Self(*b"ftyp");
    pub const MOOV: Self = Self(*b"moov");
    pub const MDAT: Self = Self(*b"mdat");
    pub const MVHD: Self = Self(*b"mvhd");
    pub const TRAK: Self = Self(*b"trak");
    pub const TKHD: Self = Self(*b"tkhd");
    pub const MDIA: Self = Self(*b"mdia");
    pub const MDHD: Self = Self(*b"mdhd");
    pub const HDLR: Self = Self(*b"hdlr");
    pub const MINF: Self = Self(*b"minf");
    pub const VMHD: Self = Self(*b"vmhd");
    pub const SMHD: Self = Self(*b"smhd");
    pub const HMHD: Self = Self(*b"hmhd");
    pub const STBL: Self = Self(*b"stbl");
    pub const STSZ: Self = Self(*b"stsz");
    pub const STZ2: Self = Self(*b"stz2");
    pub const STSC: Self = Self(*b"stsc");
    pub const STCO: Self = Self(*b"stco");
    pub const CO64: Self = Self(*b"co64");

    /// Handler type of video tracks.
    pub const VIDE: Self = Self(*b"vide");
    /// Handler type of audio tracks.
    pub const SOUN: Self = Self(*b"soun");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }

    /// Whether boxes of this type hold child boxes that the registry descends into.
    pub fn is_container(&self) -> bool {
        matches!(
            *self,
            Self::MOOV | Self::TRAK | Self::MDIA | Self::MINF | Self::STBL
        )
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parsed box header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Header {
    /// Box type code.
    pub box_type: FourCC,
    /// Box size including header.
    pub size: u64,
    /// Absolute offset of the first header byte.
    pub start: u64,
    /// Size of the header (8, or 16 for the extended-size form).
    pub header_len: u8,
}

impl Header {
    /// Absolute offset of the first payload byte.
    pub fn payload_offset(&self) -> u64 {
        self.start + self.header_len as u64
    }

    /// Payload size (size - header).
    pub fn payload_len(&self) -> u64 {
        self.size.saturating_sub(self.header_len as u64)
    }

    /// Absolute offset one past the last byte of the box.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Location of a box in the tree, from the file root down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BoxPath(Vec<FourCC>);

impl BoxPath {
    /// The file root (an empty path).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of a child box of this one.
    pub fn child(&self, box_type: FourCC) -> Self {
        let mut segments = self.0.clone();
        segments.push(box_type);
        Self(segments)
    }

    /// Number of segments, which is also the nesting depth of the box.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Type code of the last segment.
    pub fn last(&self) -> Option<FourCC> {
        self.0.last().copied()
    }

    pub fn segments(&self) -> &[FourCC] {
        &self.0
    }
}

impl fmt::Display for BoxPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<&[FourCC]> for BoxPath {
    fn from(segments: &[FourCC]) -> Self {
        Self(segments.to_vec())
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for BoxPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_path_display() {
        let path = BoxPath::root()
            .child(FourCC::MOOV)
            .child(FourCC::TRAK)
            .child(FourCC::MDIA)
            .child(FourCC::MINF)
            .child(FourCC::STBL)
            .child(FourCC::STSZ);
        assert_eq!(path.to_string(), "moov/trak/mdia/minf/stbl/stsz");
        assert_eq!(path.depth(), 6);
        assert_eq!(path.last(), Some(FourCC::STSZ));
        assert_eq!(BoxPath::root().to_string(), "/");
    }

    #[test]
    fn test_header_extents() {
        let header = Header {
            box_type: FourCC::MDAT,
            size: 116,
            start: 100,
            header_len: 16,
        };
        assert_eq!(header.payload_offset(), 116);
        assert_eq!(header.payload_len(), 100);
        assert_eq!(header.end(), 216);
    }

    #[test]
    fn test_container_types() {
        assert!(FourCC::MOOV.is_container());
        assert!(FourCC::STBL.is_container());
        assert!(!FourCC::MDAT.is_container());
        assert!(!FourCC::from_bytes(*b"udta").is_container());
        assert_eq!(FourCC::from_bytes([0xff, 0, 0, 0]).as_str(), "????");
    }
}
