//! Sector geometry detection.
//!
//! A disc image is stored either *cooked* (2048 bytes of user data per
//! sector, nothing else) or *raw* (full 2352-byte CD sectors carrying sync,
//! header, and error-correction bytes around the user data).
//!
//! ## Raw sector layout
//! ```text
//! [0x000] Sync       00 FF FF FF FF FF FF FF FF FF FF 00   (12 bytes)
//! [0x00C] Minute     (BCD)
//! [0x00D] Second     (BCD)
//! [0x00E] Frame      (BCD)
//! [0x00F] Mode       (0, 1 or 2)
//!
//! Mode 1:           [0x010] User data (2048) [0x810] EDC/ECC
//! Mode 2 formless:  [0x010] User data (2336)
//! Mode 2 XA:        [0x010] Subheader (4 bytes, repeated once)
//!                   [0x018] User data (2048 Form 1 / 2324 Form 2) ...
//! ```
//!
//! The XA subheader submode byte sits at 0x12; bit 5 selects Form 2.
//!
//! ## Detection
//! Sector 16 always holds the Primary Volume Descriptor. It is read once as
//! a raw sector and once as a cooked sector and the first layout under which
//! the descriptor signature lines up wins.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::utils::SECTOR_SIZE;
use crate::{Error, Result};

/// Size of a full raw CD sector.
pub const RAW_SECTOR_SIZE: u64 = 2352;

/// Sector holding the Primary Volume Descriptor.
pub const PVD_LBA: u32 = 16;

/// Sync pattern opening every raw data sector.
pub const SYNC_PATTERN: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

/// Primary Volume Descriptor signature: type 1 followed by `CD001`.
pub const PVD_SIGNATURE: [u8; 6] = [0x01, b'C', b'D', b'0', b'0', b'1'];

/// Offset of the XA subheader submode byte within a raw sector.
pub const XA_SUBMODE_OFFSET: u64 = 0x12;

const XA_FORM2: u8 = 0b10_0000;

/// Physical sector layout of a disc image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// 2048-byte sectors holding user data only.
    Cooked,
    /// Standard CD-ROM raw sectors. `mode` is taken from the PVD sector and
    /// fixes the user-data size for the whole image.
    Raw { mode: u8 },
    /// CD-ROM XA raw sectors. The user-data size depends on each sector's
    /// form and must be read from its subheader.
    Xa,
}

impl Geometry {
    /// Physical bytes per sector.
    pub fn sector_size(self) -> u64 {
        match self {
            Geometry::Cooked => SECTOR_SIZE,
            Geometry::Raw { .. } | Geometry::Xa => RAW_SECTOR_SIZE,
        }
    }

    /// Offset of the first user-data byte within a sector.
    pub fn user_start(self) -> u64 {
        match self {
            Geometry::Cooked => 0x00,
            Geometry::Raw { .. } => 0x10,
            Geometry::Xa => 0x18,
        }
    }

    /// User-data bytes per sector, or [`None`] when it varies per sector.
    pub fn user_size(self) -> Option<u64> {
        match self {
            Geometry::Cooked => Some(SECTOR_SIZE),
            Geometry::Raw { mode: 2 } => Some(2336),
            Geometry::Raw { .. } => Some(2048),
            Geometry::Xa => None,
        }
    }

    pub fn is_raw(self) -> bool {
        !matches!(self, Geometry::Cooked)
    }

    pub fn is_xa(self) -> bool {
        matches!(self, Geometry::Xa)
    }
}

/// User-data bytes carried by an XA sector with the given submode byte.
#[inline]
pub fn xa_user_size(submode: u8) -> u64 {
    if submode & XA_FORM2 == 0 { 2048 } else { 2324 }
}

/// Whether `buf` starts with a valid raw CD sector header.
///
/// Checks the sync pattern, that minute/second/frame are packed BCD within
/// `99:59:74`, and that the mode byte is at most 2.
pub fn is_raw_sector(buf: &[u8]) -> bool {
    if buf.len() < 0x10 || buf[..0x0C] != SYNC_PATTERN {
        return false;
    }

    let bcd = |b: u8, max_hi: u8, max_lo_at_max_hi: u8| {
        let (hi, lo) = (b >> 4, b & 0x0F);
        hi <= max_hi && lo <= 9 && (hi < max_hi || lo <= max_lo_at_max_hi)
    };

    bcd(buf[0x0C], 9, 9) && bcd(buf[0x0D], 5, 9) && bcd(buf[0x0E], 7, 4) && buf[0x0F] <= 2
}

/// Whether `buf` is exactly one Primary Volume Descriptor sector.
pub fn is_pvd(buf: &[u8]) -> bool {
    buf.len() == SECTOR_SIZE as usize && buf[..6] == PVD_SIGNATURE
}

/// Determine the sector layout of the image behind `r`.
///
/// Returns [`Error::UnrecognizedFormat`] if no layout matches.
pub fn detect<R: Read + Seek>(r: &mut R) -> Result<Geometry> {
    let raw = read_up_to(r, PVD_LBA as u64 * RAW_SECTOR_SIZE, RAW_SECTOR_SIZE as usize)?;
    let cooked = read_up_to(r, PVD_LBA as u64 * SECTOR_SIZE, SECTOR_SIZE as usize)?;

    let window = |start: usize| raw.get(start..start + SECTOR_SIZE as usize).unwrap_or(&[]);

    let geometry = if is_raw_sector(&raw) && is_pvd(window(0x10)) {
        Geometry::Raw { mode: raw[0x0F] }
    } else if is_raw_sector(&raw) && is_pvd(window(0x18)) {
        Geometry::Xa
    } else if is_pvd(&cooked) {
        Geometry::Cooked
    } else {
        return Err(Error::UnrecognizedFormat);
    };

    debug!(?geometry, "detected sector geometry");
    Ok(geometry)
}

/// Read up to `len` bytes at `offset`, stopping early at end of stream.
fn read_up_to<R: Read + Seek>(r: &mut R, offset: u64, len: usize) -> Result<Vec<u8>> {
    r.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(len);
    r.by_ref().take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
