//! Random-access byte sources.
//!
//! Everything in this crate reads its input through [`ByteSource`]: an
//! immutable handle offering reads at absolute offsets plus a total size.
//! Reads never move a shared cursor, so a source can be shared freely
//! between the scanner, the decoders and the extractor.

use crate::{Error, Result};
use bytes::Bytes;
use std::fs::File;
use std::io;
use std::path::Path;

/// Random-access, read-only input.
pub trait ByteSource {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Fails with `UnexpectedEof` if the source ends before `buf` is full.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Total length of the source in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Read `length` bytes at `offset` into a new buffer.
    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let io_err = |source| Error::Io {
            offset,
            length,
            source,
        };
        let len = usize::try_from(length).map_err(|_| {
            io_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read length exceeds address space",
            ))
        })?;
        let mut buf = vec![0u8; len];
        self.read_exact_at(offset, &mut buf).map_err(io_err)?;
        Ok(buf)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        (**self).size()
    }
}

impl ByteSource for [u8] {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let eof = || io::Error::from(io::ErrorKind::UnexpectedEof);
        let start = usize::try_from(offset).map_err(|_| eof())?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.len())
            .ok_or_else(eof)?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ByteSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.as_slice().read_exact_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

impl ByteSource for Bytes {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self[..].read_exact_at(offset, buf)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.len() as u64)
    }
}

/// File-backed source using positional reads.
#[derive(Debug)]
pub struct FileSource {
    file: File,
}

impl FileSource {
    /// Open the file at `path` for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(File::open(path)?))
    }

    /// Wrap an already opened file.
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl ByteSource for FileSource {
    #[cfg(unix)]
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.file.seek_read(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
