//! Sibling box enumeration over a byte range.

use super::{BoxPath, FourCC, Header};
use crate::source::ByteSource;
use crate::{Error, Result};

/// Size of a compact box header (32-bit size + type).
pub const HEADER_SIZE: u64 = 8;
/// Size of a box header using the 64-bit extended size form.
pub const EXTENDED_HEADER_SIZE: u64 = 16;

/// Enumerate the boxes in `[start, start + length)` of `source`.
///
/// The iterator holds no state beyond its cursor; scanning the same range
/// again yields the same headers.
pub fn scan<S: ByteSource + ?Sized>(source: &S, start: u64, length: u64) -> BoxScanner<'_, S> {
    BoxScanner::new(source, start, length, BoxPath::root())
}

/// Lazy iterator over the headers of sibling boxes.
///
/// Yields `Err` at most once; the iterator is fused afterwards.
pub struct BoxScanner<'a, S: ?Sized> {
    source: &'a S,
    parent: BoxPath,
    pos: u64,
    end: u64,
    failed: bool,
}

impl<'a, S: ByteSource + ?Sized> BoxScanner<'a, S> {
    /// Scanner over the payload of the box at `parent`; used for error paths.
    pub(crate) fn new(source: &'a S, start: u64, length: u64, parent: BoxPath) -> Self {
        let (end, failed) = match start.checked_add(length) {
            Some(end) => (end, false),
            None => (start, true),
        };
        Self {
            source,
            parent,
            pos: start,
            end,
            failed,
        }
    }

    fn read_header(&mut self) -> Result<Header> {
        let start = self.pos;
        let remaining = self.end - start;

        if remaining < HEADER_SIZE {
            return Err(Error::malformed(
                &self.parent,
                start,
                format!("{remaining} trailing bytes are too few for a box header"),
            ));
        }

        let mut raw = [0u8; 8];
        self.source
            .read_exact_at(start, &mut raw)
            .map_err(|source| Error::Io {
                offset: start,
                length: HEADER_SIZE,
                source,
            })?;

        let size32 = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64;
        let box_type = FourCC::from_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let path = self.parent.child(box_type);

        let (size, header_len) = match size32 {
            0 => (remaining, HEADER_SIZE),
            1 => {
                if remaining < EXTENDED_HEADER_SIZE {
                    return Err(Error::malformed(
                        &path,
                        start,
                        "extended size field runs past the end of the range",
                    ));
                }
                let mut ext = [0u8; 8];
                self.source
                    .read_exact_at(start + HEADER_SIZE, &mut ext)
                    .map_err(|source| Error::Io {
                        offset: start + HEADER_SIZE,
                        length: 8,
                        source,
                    })?;
                (u64::from_be_bytes(ext), EXTENDED_HEADER_SIZE)
            }
            n => (n, HEADER_SIZE),
        };

        if size < header_len {
            return Err(Error::malformed(
                &path,
                start,
                format!("box size {size} is smaller than its {header_len}-byte header"),
            ));
        }
        if size > remaining {
            return Err(Error::malformed(
                &path,
                start,
                format!("box size {size} overruns the {remaining} bytes left in the range"),
            ));
        }

        Ok(Header {
            box_type,
            size,
            start,
            header_len: header_len as u8,
        })
    }
}

impl<S: ByteSource + ?Sized> Iterator for BoxScanner<'_, S> {
    type Item = Result<Header>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            self.failed = false;
            return Some(Err(Error::malformed(
                &self.parent,
                self.end,
                "scan range overflows a 64-bit offset",
            )));
        }
        if self.pos >= self.end {
            return None;
        }

        match self.read_header() {
            Ok(header) => {
                self.pos = header.end();
                Some(Ok(header))
            }
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }
}

impl<S: ByteSource + ?Sized> std::iter::FusedIterator for BoxScanner<'_, S> {}
