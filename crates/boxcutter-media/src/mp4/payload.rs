//! Bounds-checked big-endian reads over a box payload.

use super::{BoxPath, FourCC, Header};
use crate::{Error, Result};

/// Version and flags at the start of every full box, read as one 4-byte unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FullBoxHeader {
    pub version: u8,
    /// 24-bit flags.
    pub flags: u32,
}

/// Cursor over a box payload that reports `TruncatedBox` with the box's
/// path and offset when a read runs past the end.
pub(crate) struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
    path: &'a BoxPath,
    offset: u64,
}

impl<'a> PayloadReader<'a> {
    pub(crate) fn new(data: &'a [u8], header: &Header, path: &'a BoxPath) -> Self {
        Self {
            data,
            pos: 0,
            path,
            offset: header.start,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fail unless the whole payload holds at least `total` bytes.
    pub(crate) fn require(&self, total: u64) -> Result<()> {
        if (self.data.len() as u64) < total {
            return Err(Error::TruncatedBox {
                path: self.path.clone(),
                offset: self.offset,
                need: total,
                have: self.data.len() as u64,
            });
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(self.pos as u64 + n as u64)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub(crate) fn fourcc(&mut self) -> Result<FourCC> {
        Ok(FourCC::from_bytes(self.array()?))
    }

    pub(crate) fn full_box_header(&mut self) -> Result<FullBoxHeader> {
        let raw = self.u32()?;
        Ok(FullBoxHeader {
            version: (raw >> 24) as u8,
            flags: raw & 0x00FF_FFFF,
        })
    }

    /// Build an `UnsupportedVariant` error for this box.
    pub(crate) fn unsupported(&self, detail: impl Into<String>) -> Error {
        Error::unsupported(self.path, self.offset, detail)
    }

    /// Remaining bytes, consuming them.
    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(len: usize) -> Header {
        Header {
            box_type: FourCC::STSZ,
            size: len as u64 + 8,
            start: 40,
            header_len: 8,
        }
    }

    #[test]
    fn test_reads_big_endian() {
        let data = [1, 0, 0, 3, 0x12, 0x34, 0xff, 0xfe, b'v', b'i', b'd', b'e'];
        let path = BoxPath::root().child(FourCC::STSZ);
        let mut reader = PayloadReader::new(&data, &header(data.len()), &path);

        let full = reader.full_box_header().unwrap();
        assert_eq!(full.version, 1);
        assert_eq!(full.flags, 3);
        assert_eq!(reader.u16().unwrap(), 0x1234);
        assert_eq!(reader.i16().unwrap(), -2);
        assert_eq!(reader.fourcc().unwrap(), FourCC::VIDE);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_read() {
        let data = [0u8; 6];
        let path = BoxPath::root().child(FourCC::MOOV).child(FourCC::MVHD);
        let mut reader = PayloadReader::new(&data, &header(data.len()), &path);
        reader.u32().unwrap();
        match reader.u32() {
            Err(Error::TruncatedBox {
                path,
                offset,
                need,
                have,
            }) => {
                assert_eq!(path.to_string(), "moov/mvhd");
                assert_eq!(offset, 40);
                assert_eq!(need, 8);
                assert_eq!(have, 6);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
