//! ISO9660 directory records and the flat table of contents.
//!
//! ## Directory Record
//! ```text
//! [0x00] RecordLength                       (u8)
//! [0x01] ExtendedAttributeLength            (u8)
//! [0x02] ExtentLba     (u32 LE, then BE)    (8 bytes)
//! [0x0A] DataLength    (u32 LE, then BE)    (8 bytes)
//! [0x12] RecordingDateTime                  (7 bytes)
//! [0x19] FileFlags     (bit 1 = directory)  (u8)
//! [0x1A] FileUnitSize / Interleave / VolSeq (6 bytes)
//! [0x20] NameLength                         (u8)
//! [0x21] Name          ("FILE.EXT;1", 0x00 = ".", 0x01 = "..")
//! ```
//!
//! The Primary Volume Descriptor embeds the root directory's record at
//! 0x9C. Directory extents are padded with zero bytes to the end of their
//! sectors; a zero record length ends the listing.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};

use tracing::debug;

use crate::disc::DiscReader;
use crate::disc::geometry::PVD_LBA;
use crate::utils::{SECTOR_SIZE, le_u32_at, u8_at};
use crate::{Error, Result};

/// Offset of the root directory record inside the PVD.
pub const ROOT_RECORD_OFFSET: usize = 0x9C;
/// Size of the root directory record inside the PVD.
pub const ROOT_RECORD_SIZE: usize = 0x22;

/// Directory flag in [`Extent::flags`].
pub const FLAG_DIRECTORY: u8 = 0b10;

const NAME_OFFSET: usize = 0x21;

/// One parsed directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    /// First sector of the file's data.
    pub lba: u32,
    /// Data length in bytes.
    pub size: u32,
    /// File flags.
    pub flags: u8,
    /// Name with any `;version` suffix removed.
    pub name: String,
}

impl Extent {
    /// Parse a single directory record.
    ///
    /// `record` must hold at least the fixed fields and the name.
    pub fn parse(record: &[u8]) -> Result<Self> {
        let lba = le_u32_at(record, 0x02)?;
        let size = le_u32_at(record, 0x0A)?;
        let flags = u8_at(record, 0x19)?;
        let name_len = u8_at(record, 0x20)? as usize;
        let raw = record
            .get(NAME_OFFSET..NAME_OFFSET + name_len)
            .ok_or(Error::InvalidRange)?;

        let name = match raw {
            [0x00] => ".".to_string(),
            [0x01] => "..".to_string(),
            _ => {
                let name = String::from_utf8_lossy(raw);
                match name.rsplit_once(';') {
                    Some((base, _version)) => base.to_string(),
                    None => name.into_owned(),
                }
            }
        };

        Ok(Self {
            lba,
            size,
            flags,
            name,
        })
    }

    pub fn is_dir(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0
    }

    /// Whether this is the `.` or `..` entry of a directory.
    pub fn is_self_or_parent(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Flat map from file path to extent for every file on the volume.
///
/// Each file is registered as `DIR/FILE`, `/DIR/FILE`, and `./DIR/FILE` so
/// lookups succeed whichever spelling the caller uses. Directories have no
/// entries of their own.
#[derive(Debug, Default)]
pub struct Toc {
    entries: HashMap<String, Extent>,
}

impl Toc {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the PVD and walk the whole directory tree.
    pub fn read<R: Read + Seek>(disc: &mut DiscReader<R>) -> Result<Self> {
        disc.seek_user(PVD_LBA, 0)?;
        let pvd = disc.read_user(SECTOR_SIZE as usize)?;
        let root =
            Extent::parse(&pvd[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + ROOT_RECORD_SIZE])?;

        let mut toc = Self::new();
        let mut walked = HashSet::from([root.lba]);
        toc.walk(disc, &root, "", &mut walked)?;

        debug!(files = toc.len() / 3, "built table of contents");
        Ok(toc)
    }

    /// Register `extent` under all three spellings of `dir` + its name.
    ///
    /// `dir` is either empty or ends with `/`.
    pub fn insert(&mut self, dir: &str, extent: Extent) {
        let path = format!("{dir}{}", extent.name);
        self.entries.insert(format!("/{path}"), extent.clone());
        self.entries.insert(format!("./{path}"), extent.clone());
        self.entries.insert(path, extent);
    }

    /// Look up a file by path.
    pub fn get(&self, path: &str) -> Option<&Extent> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of keys (three per file).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all `(path, extent)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Extent)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn walk<R: Read + Seek>(
        &mut self,
        disc: &mut DiscReader<R>,
        dir: &Extent,
        prefix: &str,
        walked: &mut HashSet<u32>,
    ) -> Result<()> {
        disc.seek_user(dir.lba, 0)?;
        let listing = disc.read_user(dir.size as usize)?;

        let mut subdirs = Vec::new();
        let mut i = 0;
        while let Some(&len) = listing.get(i)
            && len > 0
        {
            let len = len as usize;
            let record = listing.get(i..i + len).ok_or(Error::InvalidRange)?;
            let extent = Extent::parse(record)?;

            if !extent.is_dir() {
                self.insert(prefix, extent);
            } else if !extent.is_self_or_parent() {
                subdirs.push(extent);
            }

            i += len;
        }

        for sub in subdirs {
            if !walked.insert(sub.lba) {
                debug!(name = %sub.name, lba = sub.lba, "skipping already walked directory");
                continue;
            }
            let prefix = format!("{prefix}{}/", sub.name);
            self.walk(disc, &sub, &prefix, walked)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lba: u32, size: u32, flags: u8, name: &[u8]) -> Vec<u8> {
        let len = NAME_OFFSET + name.len() + (name.len() + 1) % 2;
        let mut buf = vec![0u8; len];
        buf[0] = len as u8;
        buf[0x02..0x06].copy_from_slice(&lba.to_le_bytes());
        buf[0x06..0x0A].copy_from_slice(&lba.to_be_bytes());
        buf[0x0A..0x0E].copy_from_slice(&size.to_le_bytes());
        buf[0x0E..0x12].copy_from_slice(&size.to_be_bytes());
        buf[0x19] = flags;
        buf[0x20] = name.len() as u8;
        buf[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
        buf
    }

    #[test]
    fn parses_file_record_and_strips_version() {
        let extent = Extent::parse(&record(0x1234, 5000, 0, b"A.TXT;1")).unwrap();
        assert_eq!(
            extent,
            Extent {
                lba: 0x1234,
                size: 5000,
                flags: 0,
                name: "A.TXT".into()
            }
        );
        assert!(!extent.is_dir());
    }

    #[test]
    fn self_and_parent_names() {
        let dot = Extent::parse(&record(20, 2048, FLAG_DIRECTORY, &[0x00])).unwrap();
        let dotdot = Extent::parse(&record(20, 2048, FLAG_DIRECTORY, &[0x01])).unwrap();
        assert_eq!(dot.name, ".");
        assert_eq!(dotdot.name, "..");
        assert!(dot.is_dir() && dot.is_self_or_parent());
        assert!(dotdot.is_self_or_parent());
    }

    #[test]
    fn name_without_version_is_kept() {
        let extent = Extent::parse(&record(1, 1, FLAG_DIRECTORY, b"DATA")).unwrap();
        assert_eq!(extent.name, "DATA");
        assert!(extent.is_dir());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let mut buf = record(1, 1, 0, b"LONGNAME.BIN;1");
        buf.truncate(0x24);
        assert!(matches!(Extent::parse(&buf), Err(Error::InvalidRange)));
    }

    #[test]
    fn insert_registers_three_spellings() {
        let mut toc = Toc::new();
        toc.insert("SUB/", Extent::parse(&record(30, 4, 0, b"BAR.BIN;1")).unwrap());
        assert_eq!(toc.len(), 3);
        for key in ["SUB/BAR.BIN", "/SUB/BAR.BIN", "./SUB/BAR.BIN"] {
            assert_eq!(toc.get(key).map(|e| e.lba), Some(30), "{key}");
        }
        assert!(!toc.contains("BAR.BIN"));
    }
}
