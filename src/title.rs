//! Known executable builds.
//!
//! Each supported release is identified by the path and CRC-32 of its main
//! executable. The entry also records how to translate the executable's
//! runtime addresses to file offsets and where its VFS table lives.
//!
//! CRC-32 uses the zlib polynomial (`CRC_32_ISO_HDLC`).

use std::io::{Read, Seek};

use crc::{CRC_32_ISO_HDLC, Crc};
use tracing::debug;

use crate::disc::DiscReader;
use crate::formats::iso9660::Toc;
use crate::formats::vfs::{
    AddressMap, FixedOffset, ProgramHeaderMap, Resolver, VfsEntry, VfsTable,
};
use crate::{Error, Result};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const IMAGE_BASE: u32 = 0x0010_0000;

/// How a title's executable maps runtime addresses to file offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translation {
    /// Constant offset absorbing this build's header layout.
    Fixed(FixedOffset),
    /// Derived from the executable's first program header.
    ProgramHeader,
}

impl Translation {
    /// Build the address map for `image`.
    pub fn address_map(&self, image: &[u8]) -> Result<Box<dyn AddressMap>> {
        let map: Box<dyn AddressMap> = match *self {
            Translation::Fixed(map) => Box::new(map),
            Translation::ProgramHeader => Box::new(ProgramHeaderMap::from_elf(image)?),
        };
        Ok(map)
    }
}

/// One supported release.
#[derive(Debug, Clone, Copy)]
pub struct Title {
    /// Product code and edition.
    pub name: &'static str,
    /// Path of the main executable in the disc's root directory.
    pub executable: &'static str,
    /// CRC-32 of the whole executable.
    pub crc: u32,
    pub translation: Translation,
    pub table: VfsTable,
}

const fn fixed(header_size: u32) -> Translation {
    Translation::Fixed(FixedOffset {
        image_base: IMAGE_BASE,
        header_size,
    })
}

/// All supported releases, checked in order.
pub const TITLES: &[Title] = &[
    Title {
        name: "SLPM-65051 (v1.50)",
        executable: "SLPM_650.51",
        crc: 0x2FB2_3919,
        translation: fixed(0x700),
        table: VfsTable { offset: 0x2B_B900, count: 3443 },
    },
    Title {
        name: "SLPM-65098 Saigo no Uta (v1.50)",
        executable: "SLPM_650.98",
        crc: 0x1388_A129,
        translation: fixed(0x800),
        table: VfsTable { offset: 0x2C_CB80, count: 3894 },
    },
    Title {
        name: "SLPM-61009 Trial Version (v1.20)",
        executable: "SLPM_610.09",
        crc: 0x37E6_204D,
        translation: fixed(0x700),
        table: VfsTable { offset: 0x2B_3180, count: 3441 },
    },
    Title {
        name: "SLPM-12345 E3 Demo (v0.30)",
        executable: "SLPM_123.45",
        crc: 0x8556_FA90,
        translation: fixed(0x80),
        table: VfsTable { offset: 0x45_C200, count: 539 },
    },
    Title {
        name: "SLUS-20228 (v1.20)",
        executable: "SLUS_202.28",
        crc: 0xAA6B_485D,
        translation: fixed(0x700),
        table: VfsTable { offset: 0x2B_B180, count: 3443 },
    },
    Title {
        name: "SLUS-20228GH Greatest Hits (v2.01)",
        executable: "SLUS_202.28",
        crc: 0xB6DA_54E6,
        translation: fixed(0x800),
        table: VfsTable { offset: 0x2C_CF00, count: 3894 },
    },
    Title {
        name: "SLES-50382 Special Edition (v1.10)",
        executable: "SLES_503.82",
        crc: 0xD340_2685,
        translation: fixed(0x800),
        table: VfsTable { offset: 0x2B_D400, count: 3724 },
    },
    Title {
        name: "SLES-51156 Director's Cut (v1.02)",
        executable: "SLES_511.56",
        crc: 0xE6CF_E16F,
        translation: fixed(0x800),
        table: VfsTable { offset: 0x2C_D980, count: 3894 },
    },
];

/// CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// A matched title together with its loaded executable.
#[derive(Debug)]
pub struct Executable<'t> {
    pub title: &'t Title,
    pub image: Vec<u8>,
}

impl Executable<'_> {
    /// Resolve the title's VFS table against `toc`.
    pub fn entries(&self, toc: &Toc) -> Result<Vec<VfsEntry>> {
        let map = self.title.translation.address_map(&self.image)?;
        Resolver::new(&self.image, &*map).resolve_table(self.title.table, toc)
    }
}

/// Find the first title in `titles` whose executable is on the disc with a
/// matching checksum.
///
/// Returns [`Error::UnknownExecutable`] if none matches.
pub fn identify<'t, R: Read + Seek>(
    disc: &mut DiscReader<R>,
    toc: &Toc,
    titles: &'t [Title],
) -> Result<Executable<'t>> {
    for title in titles {
        let Some(extent) = toc.get(title.executable) else {
            continue;
        };

        disc.seek_user(extent.lba, 0)?;
        let image = disc.read_user(extent.size as usize)?;
        let crc = crc32(&image);
        debug!(
            executable = title.executable,
            crc = format_args!("{crc:#010X}"),
            "checked executable"
        );

        if crc == title.crc {
            return Ok(Executable { title, image });
        }
    }
    Err(Error::UnknownExecutable)
}
