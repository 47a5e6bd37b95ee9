//! Logical byte stream over the user data of a disc image.
//!
//! [`DiscReader`] hides the physical sector layout: callers address data by
//! `(sector, byte offset)` and read a contiguous stream of user-data bytes.
//! Sync, header, subheader, and error-correction bytes are skipped whenever
//! a read crosses a sector boundary.
//!
//! The reader keeps its own cursor (`pos`, an absolute image offset) and
//! seeks the inner stream before every read, so the inner stream's position
//! is never relied upon between calls.

use std::io::{self, Read, Seek, SeekFrom, Take};

use super::geometry::{self, Geometry, XA_SUBMODE_OFFSET, xa_user_size};
use crate::Result;

/// Streaming user-data reader over a disc image.
pub struct DiscReader<R> {
    inner: R,
    geometry: Geometry,
    /// Absolute image offset of the next byte to read.
    pos: u64,
    /// Last XA sector whose subheader was read, and its user-data end.
    xa_window: Option<(u64, u64)>,
}

impl<R: Read + Seek> DiscReader<R> {
    /// Detect the image's geometry and wrap the provided reader.
    pub fn open(mut inner: R) -> Result<Self> {
        let geometry = geometry::detect(&mut inner)?;
        Ok(Self::with_geometry(inner, geometry))
    }

    /// Wrap a reader whose geometry is already known.
    pub fn with_geometry(inner: R, geometry: Geometry) -> Self {
        Self {
            inner,
            geometry,
            pos: 0,
            xa_window: None,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Absolute image offset of the cursor.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Position the cursor `offset` user-data bytes into the extent starting
    /// at sector `lba`.
    ///
    /// Offsets larger than one sector's user data carry over into the
    /// following sectors. For CD-XA images each skipped sector's subheader is
    /// read to learn its size. Seeking past the end of the image succeeds and
    /// leaves the cursor where subsequent reads return no data, as with a
    /// fixed sector size.
    pub fn seek_user(&mut self, lba: u32, offset: u64) -> Result<()> {
        let sector_size = self.geometry.sector_size();
        let start = self.geometry.user_start();

        let (sector, within) = match self.geometry.user_size() {
            Some(user_size) => (lba as u64 + offset / user_size, offset % user_size),
            None => {
                let mut sector = lba as u64;
                let mut remaining = offset;
                while remaining > 0 {
                    // Past the end of the image: park here so reads return 0.
                    let Some(end) = self.user_end(sector)? else {
                        remaining = 0;
                        break;
                    };
                    let size = end - start;
                    if remaining < size {
                        break;
                    }
                    remaining -= size;
                    sector += 1;
                }
                (sector, remaining)
            }
        };

        self.pos = sector * sector_size + start + within;
        Ok(())
    }

    /// Read exactly `size` user-data bytes from the cursor.
    ///
    /// Returns [`UnexpectedEof`](crate::Error::UnexpectedEof) if the image ends
    /// first.
    pub fn read_user(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Seek to `offset` within the extent at `lba` and return a reader
    /// limited to `size` user-data bytes.
    ///
    /// The borrow ends when the [`Take`] is dropped.
    pub fn read_range(&mut self, lba: u32, offset: u64, size: u64) -> Result<Take<&mut Self>> {
        self.seek_user(lba, offset)?;
        Ok(self.by_ref().take(size))
    }

    /// Consume the reader, returning the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// End of the user-data window of `sector`, relative to the sector start.
    ///
    /// Returns [`None`] if the image ends before the sector's subheader.
    fn user_end(&mut self, sector: u64) -> io::Result<Option<u64>> {
        let start = self.geometry.user_start();
        if let Some(size) = self.geometry.user_size() {
            return Ok(Some(start + size));
        }

        if let Some((cached, end)) = self.xa_window
            && cached == sector
        {
            return Ok(Some(end));
        }

        let mut submode = [0u8; 1];
        self.inner.seek(SeekFrom::Start(
            sector * self.geometry.sector_size() + XA_SUBMODE_OFFSET,
        ))?;
        match self.inner.read_exact(&mut submode) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let end = start + xa_user_size(submode[0]);
        self.xa_window = Some((sector, end));
        Ok(Some(end))
    }
}

impl<R: Read + Seek> Read for DiscReader<R> {
    /// Read user data from the cursor, never past the end of the current
    /// sector's user-data window.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.geometry == Geometry::Cooked {
            self.inner.seek(SeekFrom::Start(self.pos))?;
            let n = self.inner.read(buf)?;
            self.pos += n as u64;
            return Ok(n);
        }

        let sector_size = self.geometry.sector_size();
        let start = self.geometry.user_start();
        loop {
            let sector = self.pos / sector_size;
            let within = (self.pos % sector_size).max(start);
            let Some(end) = self.user_end(sector)? else {
                return Ok(0);
            };

            if within >= end {
                self.pos = (sector + 1) * sector_size;
                continue;
            }

            let want = buf.len().min((end - within) as usize);
            let at = sector * sector_size + within;
            self.inner.seek(SeekFrom::Start(at))?;
            let n = self.inner.read(&mut buf[..want])?;
            self.pos = at + n as u64;
            return Ok(n);
        }
    }
}
