//! Filename-to-loader dispatch.
//!
//! A [`Dispatcher`] holds the process's loader configurations, injected at
//! construction rather than held as global state, and resolves an arriving
//! path to the one
//! configuration whose filename pattern matches it. Patterns are tested in
//! registration order and the first match wins; configuration discipline is
//! expected to keep patterns disjoint.
//!
//! No match is [`IngestError::NoLoaderFound`]: a configuration error, decided
//! from the filename alone with no I/O, and not worth retrying.

use crate::config::LoaderConfig;
use crate::db::Database;
use crate::error::IngestError;
use crate::ingest::Loader;
use crate::metrics::IngestStats;
use anyhow::Result;
use std::path::Path;

/// The registered set of loader configurations for this process.
pub struct Dispatcher {
    configs: Vec<LoaderConfig>,
}

impl Dispatcher {
    /// Build a dispatcher over `configs`, tested in the given order.
    #[must_use]
    pub fn new(configs: Vec<LoaderConfig>) -> Self {
        Self { configs }
    }

    /// Resolve `path` to the loader that claims its filename.
    ///
    /// # Errors
    /// [`IngestError::NoLoaderFound`] when no pattern matches.
    pub fn dispatch(&self, path: impl AsRef<Path>) -> Result<Loader<'_>> {
        let path = path.as_ref();
        self.configs
            .iter()
            .find(|c| c.matches(path))
            .map(Loader::new)
            .ok_or_else(|| {
                IngestError::NoLoaderFound {
                    filename: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                }
                .into()
            })
    }
}

/// Ingest one file: dispatch it to its loader and run the load lifecycle.
///
/// This is the crate's entry point for batch pipelines: call it once per
/// arriving file.
///
/// # Errors
/// [`IngestError::NoLoaderFound`] if no configuration claims the filename;
/// otherwise whatever the selected loader's run surfaces (after its cleanup
/// has executed).
pub fn ingest_file(
    db: &mut dyn Database,
    dispatcher: &Dispatcher,
    path: impl AsRef<Path>,
) -> Result<IngestStats> {
    let path = path.as_ref();
    dispatcher.dispatch(path)?.run(db, path)
}
