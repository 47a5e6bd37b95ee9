#![allow(dead_code)]

use std::collections::BTreeMap;

pub const SECTOR: usize = 2048;
pub const RAW_SECTOR: usize = 2352;

const SYNC: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Cooked,
    Mode1,
    Xa,
}

/// Builds small ISO9660 volumes. Paths use `/` separators; directories are
/// created implicitly and each takes a single sector.
pub struct IsoBuilder {
    files: Vec<(String, Vec<u8>)>,
}

#[derive(Default)]
struct Dir {
    subdirs: Vec<String>,
    files: Vec<usize>,
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.files.push((path.to_string(), content.to_vec()));
        self
    }

    /// Logical 2048-byte sectors of the volume.
    pub fn sectors(&self) -> Vec<[u8; SECTOR]> {
        let mut dirs: BTreeMap<String, Dir> = BTreeMap::new();
        dirs.insert(String::new(), Dir::default());
        for (index, (path, _)) in self.files.iter().enumerate() {
            let parts: Vec<&str> = path.split('/').collect();
            let mut parent = String::new();
            for part in &parts[..parts.len() - 1] {
                let child = join(&parent, part);
                if !dirs.contains_key(&child) {
                    dirs.insert(child.clone(), Dir::default());
                    dirs.get_mut(&parent).unwrap().subdirs.push(child.clone());
                }
                parent = child;
            }
            dirs.get_mut(&parent).unwrap().files.push(index);
        }

        // 16 = PVD, 17 = terminator, 18.. = directories, then file data.
        let mut next = 18u32;
        let mut dir_lba = BTreeMap::new();
        dir_lba.insert(String::new(), next);
        next += 1;
        for name in dirs.keys().filter(|k| !k.is_empty()) {
            dir_lba.insert(name.clone(), next);
            next += 1;
        }
        let mut file_lba = Vec::new();
        for (_, content) in &self.files {
            file_lba.push(next);
            next += content.len().div_ceil(SECTOR).max(1) as u32;
        }

        let mut sectors = vec![[0u8; SECTOR]; next as usize];

        let pvd = &mut sectors[16];
        pvd[0] = 1;
        pvd[1..6].copy_from_slice(b"CD001");
        pvd[6] = 1;
        pvd[0x50..0x54].copy_from_slice(&next.to_le_bytes());
        pvd[0x9C..0x9C + 34].copy_from_slice(&record(dir_lba[""], SECTOR as u32, 2, &[0])[..34]);

        let term = &mut sectors[17];
        term[0] = 255;
        term[1..6].copy_from_slice(b"CD001");
        term[6] = 1;

        for (name, dir) in &dirs {
            let lba = dir_lba[name];
            let parent_lba = dir_lba[parent_of(name)];
            let mut listing = Vec::new();
            listing.extend(record(lba, SECTOR as u32, 2, &[0]));
            listing.extend(record(parent_lba, SECTOR as u32, 2, &[1]));
            for sub in &dir.subdirs {
                let base = sub.rsplit('/').next().unwrap();
                listing.extend(record(dir_lba[sub], SECTOR as u32, 2, base.as_bytes()));
            }
            for &index in &dir.files {
                let (path, content) = &self.files[index];
                let base = path.rsplit('/').next().unwrap();
                let versioned = format!("{base};1");
                listing.extend(record(
                    file_lba[index],
                    content.len() as u32,
                    0,
                    versioned.as_bytes(),
                ));
            }
            assert!(listing.len() <= SECTOR, "directory {name:?} too large");
            sectors[lba as usize][..listing.len()].copy_from_slice(&listing);
        }

        for (index, (_, content)) in self.files.iter().enumerate() {
            for (i, chunk) in content.chunks(SECTOR).enumerate() {
                sectors[file_lba[index] as usize + i][..chunk.len()].copy_from_slice(chunk);
            }
        }

        sectors
    }

    pub fn build(&self, layout: Layout) -> Vec<u8> {
        encode(&self.sectors(), layout)
    }
}

/// Encode logical sectors in the given physical layout.
pub fn encode(sectors: &[[u8; SECTOR]], layout: Layout) -> Vec<u8> {
    let mut image = Vec::new();
    for (lba, data) in sectors.iter().enumerate() {
        match layout {
            Layout::Cooked => image.extend_from_slice(data),
            Layout::Mode1 | Layout::Xa => {
                let mut raw = [0u8; RAW_SECTOR];
                raw[..12].copy_from_slice(&SYNC);
                let abs = lba + 150;
                raw[12] = bcd(abs / 4500);
                raw[13] = bcd((abs / 75) % 60);
                raw[14] = bcd(abs % 75);
                if layout == Layout::Mode1 {
                    raw[15] = 1;
                    raw[0x10..0x810].copy_from_slice(data);
                } else {
                    raw[15] = 2;
                    // Form 1 data subheader, stored twice.
                    raw[0x10..0x14].copy_from_slice(&[0, 0, 0x08, 0]);
                    raw[0x14..0x18].copy_from_slice(&[0, 0, 0x08, 0]);
                    raw[0x18..0x818].copy_from_slice(data);
                }
                image.extend_from_slice(&raw);
            }
        }
    }
    image
}

/// Encode one directory record.
pub fn record(lba: u32, size: u32, flags: u8, name: &[u8]) -> Vec<u8> {
    let len = 33 + name.len() + (name.len() + 1) % 2;
    let mut buf = vec![0u8; len];
    buf[0] = len as u8;
    buf[0x02..0x06].copy_from_slice(&lba.to_le_bytes());
    buf[0x06..0x0A].copy_from_slice(&lba.to_be_bytes());
    buf[0x0A..0x0E].copy_from_slice(&size.to_le_bytes());
    buf[0x0E..0x12].copy_from_slice(&size.to_be_bytes());
    buf[0x19] = flags;
    buf[0x1C] = 1;
    buf[0x20] = name.len() as u8;
    buf[0x21..0x21 + name.len()].copy_from_slice(name);
    buf
}

fn bcd(v: usize) -> u8 {
    (((v / 10) << 4) | (v % 10)) as u8
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn parent_of(dir: &str) -> &str {
    dir.rsplit_once('/').map_or("", |(parent, _)| parent)
}
