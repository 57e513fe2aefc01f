//! Spool-directory listing for batch ingestion.
//!
//! Source files arrive in a spool directory named by convention
//! (`<family>.<YYYYMMDD>.csv.gz`). The core ingests one file per invocation;
//! these helpers enumerate what is waiting so the embedding process can feed
//! [`ingest_file`](crate::ingest_file) path by path, in a deterministic
//! order.
//!
//! ```no_run
//! use granary::io::spool::pending_files;
//!
//! for path in pending_files("/var/spool/stats/*.csv.gz")? {
//!     // ingest_file(&mut db, &dispatcher, &path)?;
//! }
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

/// Expand `pattern` into the sorted list of waiting files.
///
/// Standard glob syntax (`*`, `?`, `**`, `[..]`). Directories are excluded;
/// results are sorted lexicographically, which for date-stamped filenames is
/// arrival order. An empty spool yields an empty vector, not an error.
///
/// # Errors
/// Fails on an invalid pattern or filesystem errors while listing.
pub fn pending_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern).with_context(|| format!("invalid spool pattern: {pattern}"))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("read spool entry for pattern: {pattern}"))?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Like [`pending_files`], but an empty spool is an error.
///
/// Useful for invocations that only happen because a file is known to have
/// arrived.
///
/// # Errors
/// Everything [`pending_files`] fails on, plus zero matches.
pub fn pending_files_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = pending_files(pattern)?;
    if files.is_empty() {
        bail!("no files waiting in spool for pattern: {pattern}");
    }
    Ok(files)
}
