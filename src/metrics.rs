//! Counters and reporting for ingestion runs.
//!
//! Every run produces an [`IngestStats`]: the fixed counter set a single-file
//! batch load has: rows copied and skipped, tables loaded, partitions
//! created. With the `metrics` feature (default) a [`LoadReport`] wraps the
//! stats with wall-clock timing and can print itself or export JSON for the
//! invoking process's bookkeeping.
//!
//! ```no_run
//! use granary::metrics::{IngestStats, LoadReport};
//!
//! let mut report = LoadReport::start("post_stats.20240512.csv.gz");
//! let stats = IngestStats::default(); // produced by ingest_file
//! report.finish(stats);
//! report.print();
//! report.save_to_file("load_report.json")?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use serde::{Deserialize, Serialize};

#[cfg(feature = "metrics")]
use anyhow::{Context, Result};
#[cfg(feature = "metrics")]
use std::io::Write;
#[cfg(feature = "metrics")]
use std::path::Path;
#[cfg(feature = "metrics")]
use std::time::Instant;

/// What one ingestion run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Rows copied into staging relations across all tables.
    pub rows_copied: u64,
    /// Rows dropped by the family's skip rule.
    pub rows_skipped: u64,
    /// Tables loaded to completion.
    pub tables_loaded: u32,
    /// Names of partitions touched by partition-ensure, in load order.
    pub partitions: Vec<String>,
}

impl IngestStats {
    /// Record a partition identifier returned by partition-ensure.
    pub fn note_partition(&mut self, name: &str) {
        self.partitions.push(name.to_string());
    }
}

/// A timed, exportable record of one run.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct LoadReport {
    file: String,
    started: Instant,
    elapsed_ms: Option<u128>,
    stats: IngestStats,
}

#[cfg(feature = "metrics")]
impl LoadReport {
    /// Start timing a run for `file`.
    #[must_use]
    pub fn start(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            started: Instant::now(),
            elapsed_ms: None,
            stats: IngestStats::default(),
        }
    }

    /// Stop the clock and attach the run's stats.
    pub fn finish(&mut self, stats: IngestStats) {
        self.elapsed_ms = Some(self.started.elapsed().as_millis());
        self.stats = stats;
    }

    /// The attached stats.
    #[must_use]
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    /// Render the report as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "file": self.file,
            "elapsed_ms": self.elapsed_ms.map(|ms| ms as u64),
            "rows_copied": self.stats.rows_copied,
            "rows_skipped": self.stats.rows_skipped,
            "tables_loaded": self.stats.tables_loaded,
            "partitions": self.stats.partitions,
        })
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== load report: {} ===", self.file);
        if let Some(ms) = self.elapsed_ms {
            println!("elapsed_ms: {ms}");
        }
        println!("rows_copied: {}", self.stats.rows_copied);
        println!("rows_skipped: {}", self.stats.rows_skipped);
        println!("tables_loaded: {}", self.stats.tables_loaded);
        if !self.stats.partitions.is_empty() {
            println!("partitions: {}", self.stats.partitions.join(", "));
        }
    }

    /// Write the report to `path` as pretty-printed JSON.
    ///
    /// # Errors
    /// Fails on serialization or file I/O errors.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_json())?;
        let mut f =
            std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
        f.write_all(json.as_bytes())?;
        Ok(())
    }
}
