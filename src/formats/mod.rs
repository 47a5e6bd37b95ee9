//! Parsers for the on-disc and in-executable structures.
//!
//! All parsers follow the same conventions:
//!
//! * **Disc structures** are read through a [`crate::disc::DiscReader`], so
//!   they never see raw sector headers.
//! * **Executable structures** are decoded from an in-memory image with
//!   bounds-checked field helpers; a bad address is an error, never a panic.
//! * **Metadata only** - file data is never eagerly loaded. Use
//!   [`crate::extract`] to copy it out.
//!
//! ## Format overview
//!
//! | Module      | Format  | Description |
//! |-------------|---------|-------------|
//! | [`iso9660`] | ISO9660 | Directory records and the flat path → extent table |
//! | [`elf`]     | ELF32   | Header and program headers of the game executable |
//! | [`vfs`]     | VFS     | Executable-embedded fragment chains locating assets inside containers |

pub mod elf;
pub mod iso9660;
pub mod vfs;
