//! The per-file orchestrator: one loader run from setup to cleanup.
//!
//! A [`Loader`] executes one file against one [`LoaderConfig`]:
//!
//! ```text
//! setup -> for each table: resolve columns -> [ensure partition]
//!            -> pick + stage-and-merge  -> cleanup (always) -> done
//! ```
//!
//! Cleanup is the run's one unconditional guarantee: it executes even when a
//! table load fails, and the original failure (never a cleanup failure) is
//! what the caller sees. Each table load opens a fresh decompressed stream
//! and its own transaction; a later table's failure never rolls back an
//! earlier table's commit.

use crate::config::LoaderConfig;
use crate::db::Database;
use crate::io::compression::open_source;
use crate::load::bulk_load;
use crate::metrics::IngestStats;
use crate::partition::ensure_partition;
use crate::picker::RecordPicker;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// One file-load plan, borrowed from its immutable configuration.
pub struct Loader<'a> {
    config: &'a LoaderConfig,
}

impl<'a> Loader<'a> {
    /// Wrap a configuration for execution.
    #[must_use]
    pub fn new(config: &'a LoaderConfig) -> Self {
        Self { config }
    }

    /// Whether this loader's pattern claims `path`'s filename.
    #[must_use]
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        self.config.matches(path)
    }

    /// Run the full load lifecycle for `path`.
    ///
    /// # Errors
    /// Propagates the first failure from setup or any table load, after
    /// cleanup has run. A cleanup failure after an otherwise clean run is the
    /// run's error; a cleanup failure after a table failure is logged and the
    /// table failure wins.
    pub fn run(&self, db: &mut dyn Database, path: impl AsRef<Path>) -> Result<IngestStats> {
        let path = path.as_ref();
        let mut stats = IngestStats::default();
        info!(loader = self.config.name(), file = %path.display(), "ingest starting");

        if let Some(sql) = self.config.setup_sql() {
            db.execute(sql).context("setup statement")?;
        }

        let outcome = self.load_tables(db, path, &mut stats);

        if let Some(sql) = self.config.cleanup_sql()
            && let Err(cleanup_err) = db.execute(sql).context("cleanup statement")
        {
            if outcome.is_ok() {
                return Err(cleanup_err);
            }
            warn!(loader = self.config.name(), error = %cleanup_err, "cleanup failed after load failure");
        }

        outcome?;
        info!(
            loader = self.config.name(),
            rows = stats.rows_copied,
            skipped = stats.rows_skipped,
            tables = stats.tables_loaded,
            "ingest finished"
        );
        Ok(stats)
    }

    fn load_tables(
        &self,
        db: &mut dyn Database,
        path: &Path,
        stats: &mut IngestStats,
    ) -> Result<()> {
        for spec in self.config.tables() {
            spec.validate()?;
            let destination = spec.destination_columns();

            if let (Some(column), Some(range)) = (&spec.partitioned_on, spec.partition_range) {
                let date = self.config.file_date(path)?;
                let partition = ensure_partition(db, &spec.table, date, column, range)
                    .with_context(|| format!("ensure partition for table '{}'", spec.table))?;
                stats.note_partition(&partition);
            }

            // Each table re-reads the file from the top; streams are
            // single-pass and owned by exactly one table load.
            let source = open_source(path)?;
            let mut picker = RecordPicker::new(source, &spec.csv_columns, self.config.skip())
                .with_context(|| format!("build picker for table '{}'", spec.table))?;

            let rows = bulk_load(db, &mut picker, &spec.table, &destination, &spec.on_conflict)
                .with_context(|| format!("load table '{}'", spec.table))?;

            stats.rows_copied += rows;
            stats.rows_skipped += picker.skipped();
            stats.tables_loaded += 1;
        }
        Ok(())
    }
}
