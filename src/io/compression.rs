//! Transparent decompression of source archives.
//!
//! Source files arrive compressed; the loader only ever needs a readable
//! character stream out of them. [`open_source`] opens a path and wraps it
//! with the right decompressor, detected from the file extension (fast path)
//! or the stream's magic bytes (fallback), and passes plain files through
//! untouched.
//!
//! Codecs are pluggable behind [`DecompressionCodec`]; the built-in set is
//! gzip (feature `compression-gzip`, default, matching the `.csv.gz` arrival
//! convention) and zstd (feature `compression-zstd`). Only the read side
//! exists here: this crate consumes archives, it never produces them.
//!
//! Errors from a missing file or a corrupt archive are fatal and propagate to
//! the caller; there is nothing to recover at this layer.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A pluggable decompression algorithm.
///
/// Implementations are matched by file extension first, then by magic bytes
/// peeked from the stream head.
pub trait DecompressionCodec: Send + Sync {
    /// Codec name for error context (e.g. "gzip").
    fn name(&self) -> &str;

    /// Lowercase extensions this codec claims, leading dot included.
    fn extensions(&self) -> &[&str];

    /// Magic byte signature, if the format has a reliable one.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` with this codec's decompressor.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

/// The compiled-in codec set, in detection order.
const BUILTIN_CODECS: &[&dyn DecompressionCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
    #[cfg(feature = "compression-zstd")]
    &ZstdCodec,
];

fn detect_from_extension(path: &Path) -> Option<&'static dyn DecompressionCodec> {
    let path = path.to_string_lossy().to_lowercase();
    BUILTIN_CODECS
        .iter()
        .copied()
        .find(|codec| codec.extensions().iter().any(|ext| path.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn DecompressionCodec> {
    // Peeks without advancing; an unreadable or empty head means no match.
    let head = reader.fill_buf().ok()?;
    BUILTIN_CODECS.iter().copied().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| head.len() >= magic.len() && head.starts_with(magic))
    })
}

/// Wrap `reader` with decompression when `path_hint` or the stream head says
/// the content is compressed; otherwise return it buffered and untouched.
///
/// # Errors
/// Fails if the detected codec cannot initialize over the stream.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = detect_from_extension(path_hint.as_ref()) {
        return codec
            .wrap_reader(Box::new(reader))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buffered = BufReader::new(reader);
    if let Some(codec) = detect_from_magic(&mut buffered) {
        return codec
            .wrap_reader(Box::new(buffered))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    Ok(Box::new(buffered))
}

/// Open `path` as a readable stream of decompressed text.
///
/// # Errors
/// A missing file or an unopenable archive is fatal and propagates.
pub fn open_source(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    auto_detect_reader(file, path)
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl DecompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::GzDecoder;
        Ok(Box::new(GzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl DecompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}
