//! Executable-embedded virtual file system.
//!
//! The game executable carries a table of `(node, path)` address pairs, one
//! per virtual file. Each node describes where the file lives inside a real
//! container file on the disc. Files split into fragments form a singly
//! linked chain of fragment nodes ending at a node naming the container.
//!
//! All addresses are runtime virtual addresses and are mapped back to file
//! offsets through an [`AddressMap`].
//!
//! ## Table Row (8 bytes)
//! ```text
//! [0x00] NodeAddress  (u32 LE)
//! [0x04] PathAddress  (u32 LE) - zero-terminated virtual path
//! ```
//!
//! ## Fragment Node (tag 0x50)
//! ```text
//! [0x00] Tag          (u32 LE) = 0x50
//! [0x04] Next         (u32 LE) - address of the next node
//! [0x08] Offset       (u32 LE) - added to the running container offset
//! [0x0C] Size         (u32 LE) - file size (read from the first node only)
//! ```
//!
//! ## Terminal Node (any other tag)
//! ```text
//! [0x00] Tag          (u32 LE)
//! [0x04] PathAddress  (u32 LE) - zero-terminated container path
//! ```

use std::collections::HashSet;

use tracing::debug;

use super::elf::ElfHeader;
use super::iso9660::Toc;
use crate::utils::{le_u32_at, null_string};
use crate::{Error, Result};

/// Tag of a fragment node.
pub const FRAGMENT_TAG: u32 = 0x50;

/// Bytes per table row.
pub const ROW_SIZE: usize = 8;

const NODE_SIZE: usize = 0x10;

/// Maps a runtime virtual address to a byte offset in the executable file.
///
/// Returns [`None`] when the address cannot belong to the image.
pub trait AddressMap {
    fn file_offset(&self, vaddr: u32) -> Option<u64>;
}

impl<F: Fn(u32) -> Option<u64>> AddressMap for F {
    fn file_offset(&self, vaddr: u32) -> Option<u64> {
        self(vaddr)
    }
}

/// `vaddr - image_base + header_size`, with a per-build constant header
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOffset {
    pub image_base: u32,
    pub header_size: u32,
}

impl AddressMap for FixedOffset {
    fn file_offset(&self, vaddr: u32) -> Option<u64> {
        let offset = vaddr as i64 - self.image_base as i64 + self.header_size as i64;
        u64::try_from(offset).ok()
    }
}

/// `p_offset + vaddr - p_vaddr`, using the image's first program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeaderMap {
    pub offset: u32,
    pub vaddr: u32,
}

impl ProgramHeaderMap {
    /// Build the map from the ELF headers of `image`.
    pub fn from_elf(image: &[u8]) -> Result<Self> {
        let header = ElfHeader::parse(image)?;
        let ph = header.program_header(image, 0)?;
        Ok(Self {
            offset: ph.offset,
            vaddr: ph.vaddr,
        })
    }
}

impl AddressMap for ProgramHeaderMap {
    fn file_offset(&self, vaddr: u32) -> Option<u64> {
        let offset = self.offset as i64 + vaddr as i64 - self.vaddr as i64;
        u64::try_from(offset).ok()
    }
}

/// Location of the VFS table inside the executable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsTable {
    /// File offset of the first row.
    pub offset: usize,
    /// Number of rows.
    pub count: usize,
}

/// A virtual file located inside a container on the disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    /// Path of the asset inside the virtual file system.
    pub virtual_path: String,
    /// Upper-cased path of the container file on the disc.
    pub container_path: String,
    /// Byte offset of the asset within the container.
    pub offset: u64,
    /// Asset size in bytes.
    pub size: u64,
}

/// Outcome of resolving one table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(VfsEntry),
    /// The row's node is not a fragment node, so it is not a regular file.
    NotAFile,
    /// The container is not on this disc (another edition or language).
    MissingContainer { container_path: String },
}

/// Walks VFS node chains inside an executable image.
pub struct Resolver<'a> {
    image: &'a [u8],
    map: &'a dyn AddressMap,
}

impl<'a> Resolver<'a> {
    pub fn new(image: &'a [u8], map: &'a dyn AddressMap) -> Self {
        Self { image, map }
    }

    /// Resolve every row of `table`, keeping only files whose container is
    /// present in `toc`.
    pub fn resolve_table(&self, table: VfsTable, toc: &Toc) -> Result<Vec<VfsEntry>> {
        let mut entries = Vec::new();
        for index in 0..table.count {
            let row = index
                .checked_mul(ROW_SIZE)
                .and_then(|o| o.checked_add(table.offset))
                .ok_or(Error::InvalidRange)?;
            let node = le_u32_at(self.image, row)?;
            let path = le_u32_at(self.image, row + 4)?;

            match self.resolve(node, path, toc)? {
                Resolution::Resolved(entry) => entries.push(entry),
                Resolution::NotAFile => {}
                Resolution::MissingContainer { container_path } => {
                    debug!(row = index, %container_path, "container not on disc");
                }
            }
        }
        Ok(entries)
    }

    /// Resolve a single `(node, path)` row.
    pub fn resolve(&self, node: u32, path: u32, toc: &Toc) -> Result<Resolution> {
        let mut at = self.node(node)?;
        if le_u32_at(self.image, at)? != FRAGMENT_TAG {
            return Ok(Resolution::NotAFile);
        }

        let size = le_u32_at(self.image, at + 0x0C)? as u64;
        let mut offset = 0u64;
        let mut visited = HashSet::new();

        while le_u32_at(self.image, at)? == FRAGMENT_TAG {
            if !visited.insert(at) {
                return Err(Error::ChainLoop { address: node });
            }
            offset += le_u32_at(self.image, at + 0x08)? as u64;
            at = self.node(le_u32_at(self.image, at + 0x04)?)?;
        }

        let container = self.string(le_u32_at(self.image, at + 0x04)?)?;
        let container_path = container.to_ascii_uppercase();
        if !toc.contains(&container_path) {
            return Ok(Resolution::MissingContainer { container_path });
        }

        Ok(Resolution::Resolved(VfsEntry {
            virtual_path: self.string(path)?,
            container_path,
            offset,
            size,
        }))
    }

    /// File offset of the node at `vaddr`, checked to fit in the image.
    fn node(&self, vaddr: u32) -> Result<usize> {
        let at = self.translate(vaddr)?;
        if at.checked_add(NODE_SIZE).is_none_or(|end| end > self.image.len()) {
            return Err(Error::InvalidRange);
        }
        Ok(at)
    }

    fn string(&self, vaddr: u32) -> Result<String> {
        null_string(self.image, self.translate(vaddr)?)
    }

    fn translate(&self, vaddr: u32) -> Result<usize> {
        self.map
            .file_offset(vaddr)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or(Error::InvalidRange)
    }
}
