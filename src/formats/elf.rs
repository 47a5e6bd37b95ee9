//! ELF32 (little-endian) executable headers.
//!
//! Only the fields needed to map a runtime address back to a file offset
//! are decoded: the program header table location and the first program
//! header's file offset / virtual address pair.
//!
//! ## ELF Header (0x34 bytes)
//! ```text
//! [0x00] Magic 7F 'E' 'L' 'F'               (4 bytes)
//! [0x04] Class (1 = 32-bit)                 (u8)
//! [0x05] Data  (1 = little-endian)          (u8)
//! [0x06] … Type, Machine, Version
//! [0x18] Entry                              (u32 LE)
//! [0x1C] ProgramHeaderOffset                (u32 LE)
//! [0x20] SectionHeaderOffset                (u32 LE)
//! [0x24] Flags                              (u32 LE)
//! [0x28] HeaderSize                         (u16 LE)
//! [0x2A] ProgramHeaderEntrySize             (u16 LE)
//! [0x2C] ProgramHeaderCount                 (u16 LE)
//! ```
//!
//! ## Program Header (0x20 bytes)
//! ```text
//! [0x00] Type      [0x04] Offset    [0x08] VirtualAddress
//! [0x0C] PhysAddr  [0x10] FileSize  [0x14] MemorySize
//! [0x18] Flags     [0x1C] Align
//! ```

use std::io::{Cursor, Seek, SeekFrom};

use crate::utils::{bytesa, le_u16, le_u32, magic};
use crate::{Error, Result};

/// Decoded ELF header fields.
#[derive(Debug, Clone, Copy)]
pub struct ElfHeader {
    pub entry: u32,
    pub ph_offset: u32,
    pub ph_entry_size: u16,
    pub ph_count: u16,
}

/// One program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub kind: u32,
    pub offset: u32,
    pub vaddr: u32,
    pub file_size: u32,
    pub mem_size: u32,
}

impl ElfHeader {
    /// Parse the header at the start of `image`.
    pub fn parse(image: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(image);

        magic(&mut r, b"\x7FELF", "missing ELF magic")?;
        let [class, data] = bytesa::<2>(&mut r)?;
        if class != 1 || data != 1 {
            return Err(Error::Parse("not a little-endian ELF32 image"));
        }

        r.seek(SeekFrom::Start(0x18))?;
        let entry = le_u32(&mut r)?;
        let ph_offset = le_u32(&mut r)?;

        r.seek(SeekFrom::Start(0x2A))?;
        let ph_entry_size = le_u16(&mut r)?;
        let ph_count = le_u16(&mut r)?;

        Ok(Self {
            entry,
            ph_offset,
            ph_entry_size,
            ph_count,
        })
    }

    /// Read the `index`-th program header from `image`.
    pub fn program_header(&self, image: &[u8], index: u16) -> Result<ProgramHeader> {
        if index >= self.ph_count {
            return Err(Error::InvalidRange);
        }

        let mut r = Cursor::new(image);
        let at = self.ph_offset as u64 + index as u64 * self.ph_entry_size as u64;
        r.seek(SeekFrom::Start(at))?;

        let kind = le_u32(&mut r)?;
        let offset = le_u32(&mut r)?;
        let vaddr = le_u32(&mut r)?;
        let _paddr = le_u32(&mut r)?;
        let file_size = le_u32(&mut r)?;
        let mem_size = le_u32(&mut r)?;

        Ok(ProgramHeader {
            kind,
            offset,
            vaddr,
            file_size,
            mem_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elf_with_segment(offset: u32, vaddr: u32) -> Vec<u8> {
        let mut image = vec![0u8; 0x100];
        image[..4].copy_from_slice(b"\x7FELF");
        image[4] = 1;
        image[5] = 1;
        image[0x18..0x1C].copy_from_slice(&0x0010_0008u32.to_le_bytes());
        image[0x1C..0x20].copy_from_slice(&0x34u32.to_le_bytes());
        image[0x2A..0x2C].copy_from_slice(&0x20u16.to_le_bytes());
        image[0x2C..0x2E].copy_from_slice(&1u16.to_le_bytes());
        image[0x34..0x38].copy_from_slice(&1u32.to_le_bytes());
        image[0x38..0x3C].copy_from_slice(&offset.to_le_bytes());
        image[0x3C..0x40].copy_from_slice(&vaddr.to_le_bytes());
        image[0x44..0x48].copy_from_slice(&0x80u32.to_le_bytes());
        image
    }

    #[test]
    fn reads_first_program_header() {
        let image = elf_with_segment(0x80, 0x0010_0000);
        let header = ElfHeader::parse(&image).unwrap();
        assert_eq!(header.entry, 0x0010_0008);
        assert_eq!(header.ph_count, 1);

        let ph = header.program_header(&image, 0).unwrap();
        assert_eq!(ph.kind, 1);
        assert_eq!(ph.offset, 0x80);
        assert_eq!(ph.vaddr, 0x0010_0000);
        assert_eq!(ph.file_size, 0x80);
        assert!(matches!(
            header.program_header(&image, 1),
            Err(Error::InvalidRange)
        ));
    }

    #[test]
    fn rejects_non_elf() {
        assert!(matches!(
            ElfHeader::parse(&[0u8; 0x40]),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            ElfHeader::parse(b"\x7FEL"),
            Err(Error::UnexpectedEof)
        ));
    }
}
