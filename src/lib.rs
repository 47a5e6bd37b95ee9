//! **sh2ex** - asset extraction for games that hide their files in a virtual
//! file system described by the main executable.
//!
//! # Pipeline
//! | Step | Module | Result |
//! |------|--------|--------|
//! | 1 | [`disc::geometry`]   | sector layout of the image (cooked, raw, CD-XA) |
//! | 2 | [`disc::reader`]     | seekable stream over user data only |
//! | 3 | [`formats::iso9660`] | flat table of contents for the disc's real files |
//! | 4 | [`title`]            | executable identified by CRC-32 |
//! | 5 | [`formats::vfs`]     | `(container, offset, size)` per virtual file |
//! | 6 | [`extract`]          | assets copied to the output directory |

pub mod cli;
pub mod disc;
pub mod error;
pub mod extract;
pub mod formats;
pub mod title;
pub mod utils;

pub use error::{Error, Result};
