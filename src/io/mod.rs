//! Source-side I/O: decompression and spool listing.

pub mod compression;
pub mod spool;
