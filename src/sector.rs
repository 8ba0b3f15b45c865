//! Raw byte access to the underlying device

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{Fat32Error, Result};

/// Supplier of raw volume bytes.
///
/// Offsets are relative to the start of the FAT32 volume. The core never
/// writes through this trait.
pub trait SectorSource {
    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Must either fill the whole buffer or fail; a partial read is an error.
    fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

impl<S: SectorSource + ?Sized> SectorSource for &mut S {
    fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_bytes(offset, buf)
    }
}

/// `SectorSource` over anything seekable: device handles, image files, cursors.
#[derive(Debug)]
pub struct DeviceSource<R> {
    inner: R,
    /// Byte position of the volume inside `inner`
    base_offset: u64,
}

impl<R: Read + Seek> DeviceSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Volume starts `base_offset` bytes into `inner` (e.g. a partition
    /// inside a whole-disk image).
    pub fn with_offset(inner: R, base_offset: u64) -> Self {
        Self { inner, base_offset }
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> SectorSource for DeviceSource<R> {
    fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let absolute = self.base_offset + offset;
        // Always seek: the handle may have been moved by a previous read
        self.inner.seek(SeekFrom::Start(absolute))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled < buf.len() {
            log::debug!(
                "read_bytes: short read at {:#x}: {} of {} bytes",
                absolute,
                filled,
                buf.len()
            );
            return Err(Fat32Error::short_read(offset, buf.len(), filled));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_exact_range() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut src = DeviceSource::new(Cursor::new(data));
        let mut buf = [0u8; 4];
        src.read_bytes(10, &mut buf).unwrap();
        assert_eq!(buf, [10, 11, 12, 13]);
    }

    #[test]
    fn honours_base_offset() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut src = DeviceSource::with_offset(Cursor::new(data), 100);
        let mut buf = [0u8; 2];
        src.read_bytes(5, &mut buf).unwrap();
        assert_eq!(buf, [105, 106]);
    }

    #[test]
    fn short_read_is_an_error() {
        let mut src = DeviceSource::new(Cursor::new(vec![0u8; 16]));
        let mut buf = [0u8; 8];
        match src.read_bytes(12, &mut buf) {
            Err(Fat32Error::ShortRead {
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(offset, 12);
                assert_eq!(expected, 8);
                assert_eq!(actual, 4);
            }
            other => panic!("expected ShortRead, got {:?}", other),
        }
    }
}
