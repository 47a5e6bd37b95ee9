//! Copying assets out of the disc image.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::disc::DiscReader;
use crate::formats::iso9660::Toc;
use crate::formats::vfs::VfsEntry;
use crate::{Error, Result};

/// Bytes requested from the source per read.
pub const CHUNK_SIZE: usize = 2048;

/// Default output directory for `image`: `<stem> - extracted` next to it.
pub fn output_root(image: &Path) -> PathBuf {
    let stem = image.file_stem().unwrap_or(image.as_os_str());
    let mut name = stem.to_os_string();
    name.push(" - extracted");
    image.with_file_name(name)
}

/// Place `virtual_path` under `root`.
///
/// Root, prefix, and `..` components are dropped so the result always stays
/// inside `root`.
pub fn output_path(root: &Path, virtual_path: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for component in Path::new(virtual_path).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path
}

/// Copy exactly `size` bytes from `src` into a new file at `out_path`,
/// creating parent directories as needed.
///
/// Returns the number of bytes written. If `src` runs dry first, the partial
/// file is kept and [`Error::Truncated`] is returned.
pub fn extract<R: Read>(src: &mut R, out_path: &Path, size: u64) -> Result<u64> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(out_path)?);

    let mut buf = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    while written < size {
        let want = (size - written).min(CHUNK_SIZE as u64) as usize;
        let n = fill(src, &mut buf[..want])?;
        out.write_all(&buf[..n])?;
        written += n as u64;

        if n < want {
            out.flush()?;
            return Err(Error::Truncated {
                expected: size,
                written,
            });
        }
    }

    out.flush()?;
    Ok(written)
}

/// Extract one resolved VFS entry below `root`.
pub fn extract_entry<R: Read + Seek>(
    disc: &mut DiscReader<R>,
    toc: &Toc,
    entry: &VfsEntry,
    root: &Path,
) -> Result<PathBuf> {
    let container = toc
        .get(&entry.container_path)
        .ok_or(Error::Parse("container missing from table of contents"))?;
    let out_path = output_path(root, &entry.virtual_path);

    disc.seek_user(container.lba, entry.offset)?;
    extract(disc, &out_path, entry.size)?;
    Ok(out_path)
}

/// Totals from [`extract_all`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub extracted: usize,
    pub truncated: usize,
}

/// Extract every entry in order, reporting truncated assets and carrying on.
pub fn extract_all<R: Read + Seek>(
    disc: &mut DiscReader<R>,
    toc: &Toc,
    entries: &[VfsEntry],
    root: &Path,
) -> Result<Summary> {
    let mut summary = Summary::default();
    for entry in entries {
        match extract_entry(disc, toc, entry, root) {
            Ok(_) => {
                info!("Extracted: {}", entry.virtual_path);
                summary.extracted += 1;
            }
            Err(Error::Truncated { expected, written }) => {
                warn!(
                    path = %entry.virtual_path,
                    expected,
                    written,
                    "asset truncated by end of image"
                );
                summary.truncated += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}

/// Read until `buf` is full or `src` reaches end of stream.
fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
