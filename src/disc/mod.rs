//! Disc image access.
//!
//! * [`geometry`] - detects whether an image is cooked, raw CD-ROM, or raw
//!   CD-ROM XA.
//! * [`reader`] - [`reader::DiscReader`], a seekable stream over user data
//!   only, generic over [`std::io::Read`] + [`std::io::Seek`].

pub mod geometry;
pub mod reader;

pub use geometry::Geometry;
pub use reader::DiscReader;
