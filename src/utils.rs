//! Low-level binary field helpers shared by all parsers.
//!
//! Reader-based helpers read exactly the bytes they promise or return an
//! error. Slice-based helpers (`*_at`) index into an in-memory buffer and
//! return [`Error::InvalidRange`] instead of panicking when the field does
//! not fit.

use std::io::Read;

use crate::{Error, Result};

/// Logical sector size of an ISO9660 volume.
pub const SECTOR_SIZE: u64 = 2048;

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b)?;
    Ok(u16::from_le_bytes(b))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::Parse`] with `what` on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(
    r: &mut R,
    expected: &[u8; N],
    what: &'static str,
) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::Parse(what));
    }
    Ok(())
}

/// Byte at `offset`.
#[inline]
pub(crate) fn u8_at(buf: &[u8], offset: usize) -> Result<u8> {
    buf.get(offset).copied().ok_or(Error::InvalidRange)
}

/// Little-endian `u32` at `offset`.
#[inline]
pub(crate) fn le_u32_at(buf: &[u8], offset: usize) -> Result<u32> {
    let end = offset.checked_add(4).ok_or(Error::InvalidRange)?;
    let bytes = buf.get(offset..end).ok_or(Error::InvalidRange)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Extract a null-terminated string from a byte slice at `offset`.
///
/// Returns [`Error::InvalidRange`] if `offset` is out of bounds, or
/// [`Error::UnterminatedName`] if no null byte is found.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf.get(offset..).ok_or(Error::InvalidRange)?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::UnterminatedName)?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}

/// Distance from the start of a record of `size` bytes to the start of the
/// next sector-aligned record.
///
/// A zero-sized record still occupies one sector: `pad_sector(0) == 2048`.
#[inline]
pub fn pad_sector(size: u64) -> u64 {
    ((size.max(1) - 1) & !(SECTOR_SIZE - 1)) + SECTOR_SIZE
}
