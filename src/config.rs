//! Loader configuration: which files a family owns and how its tables load.
//!
//! A [`LoaderConfig`] describes one source-file family: the filename pattern
//! that claims arriving files (with a named `date` capture embedding the file
//! date), an optional per-row skip rule, optional setup/cleanup statements,
//! and the ordered list of [`TableSpec`]s to load. Configurations are built
//! once, up front, and never mutated during a run.
//!
//! ```no_run
//! use granary::{LoaderConfig, TableSpec, RowAction};
//! # fn main() -> anyhow::Result<()> {
//! let config = LoaderConfig::new("post_stats", r"post_stats\.(?P<date>\d{8})\.csv\.gz$")?
//!     .skip_rule(|row| {
//!         if row.get("url") == Some("TOTAL") { RowAction::Skip } else { RowAction::Keep }
//!     })
//!     .setup("SELECT pg_advisory_lock(42)")
//!     .cleanup("SELECT pg_advisory_unlock(42)")
//!     .table(
//!         TableSpec::new("sp_stats", ["url", "stat_name"])
//!             .map_column("url", "posts_url")
//!             .on_conflict("DO NOTHING")
//!             .partitioned("post_created_at", 7),
//!     );
//! # let _ = config; Ok(())
//! # }
//! ```

use crate::error::IngestError;
use crate::picker::{RowAction, RowView, SkipRule};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// How one destination table is loaded from a source file.
///
/// `csv_columns` is ordered: it defines both the projection order out of the
/// source and, after `column_map` renames, the destination column order.
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Destination table name.
    pub table: String,
    /// Source-side column names to extract, in order.
    pub csv_columns: Vec<String>,
    /// Source-name → destination-name renames; unmapped names pass through.
    pub column_map: HashMap<String, String>,
    /// Conflict-resolution clause, passed verbatim to the merge statement.
    pub on_conflict: String,
    /// Partition key column on the destination table, if it is partitioned.
    pub partitioned_on: Option<String>,
    /// Width of each partition in days. Required iff `partitioned_on` is set.
    pub partition_range: Option<u32>,
}

impl TableSpec {
    /// Start a spec for `table` projecting `csv_columns` in order.
    ///
    /// The conflict clause defaults to `DO NOTHING`; override with
    /// [`on_conflict`](Self::on_conflict).
    pub fn new<T, I, S>(table: T, csv_columns: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            csv_columns: csv_columns.into_iter().map(Into::into).collect(),
            column_map: HashMap::new(),
            on_conflict: "DO NOTHING".to_string(),
            partitioned_on: None,
            partition_range: None,
        }
    }

    /// Rename a source column on its way into the destination table.
    #[must_use]
    pub fn map_column(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.column_map.insert(from.into(), to.into());
        self
    }

    /// Set the `ON CONFLICT` clause, passed through verbatim.
    #[must_use]
    pub fn on_conflict(mut self, clause: impl Into<String>) -> Self {
        self.on_conflict = clause.into();
        self
    }

    /// Mark the destination as range-partitioned on `column`, `range_days`
    /// wide per partition.
    #[must_use]
    pub fn partitioned(mut self, column: impl Into<String>, range_days: u32) -> Self {
        self.partitioned_on = Some(column.into());
        self.partition_range = Some(range_days);
        self
    }

    /// The destination column list: `column_map` applied to `csv_columns`,
    /// order preserved.
    #[must_use]
    pub fn destination_columns(&self) -> Vec<String> {
        self.csv_columns
            .iter()
            .map(|c| self.column_map.get(c).unwrap_or(c).clone())
            .collect()
    }

    /// Check the spec is structurally loadable.
    ///
    /// # Errors
    /// [`IngestError::InvalidSpec`] for an empty column list, a partition key
    /// without a range (or vice versa), or a zero-width range.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(IngestError::InvalidSpec {
                table: self.table.clone(),
                reason: reason.to_string(),
            }
            .into())
        };
        if self.csv_columns.is_empty() {
            return fail("csv_columns is empty");
        }
        match (&self.partitioned_on, self.partition_range) {
            (Some(_), None) => fail("partitioned_on set without partition_range"),
            (None, Some(_)) => fail("partition_range set without partitioned_on"),
            (Some(_), Some(0)) => fail("partition_range must be at least one day"),
            _ => Ok(()),
        }
    }
}

/// Configuration for one source-file family.
#[derive(Clone)]
pub struct LoaderConfig {
    name: String,
    pattern: Regex,
    skip_rule: Option<SkipRule>,
    tables: Vec<TableSpec>,
    setup_sql: Option<String>,
    cleanup_sql: Option<String>,
}

impl LoaderConfig {
    /// Create a configuration named `name` claiming filenames that match
    /// `pattern`.
    ///
    /// The pattern should carry a named `date` capture
    /// (`(?P<date>\d{8})`, `YYYYMMDD`) when any table is partitioned; the
    /// capture supplies the partition key date.
    ///
    /// # Errors
    /// Fails if the pattern is not a valid regular expression.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern)
            .with_context(|| format!("invalid filename pattern for loader '{name}'"))?;
        Ok(Self {
            name,
            pattern,
            skip_rule: None,
            tables: Vec::new(),
            setup_sql: None,
            cleanup_sql: None,
        })
    }

    /// Append a table to the load sequence. Tables load in insertion order.
    #[must_use]
    pub fn table(mut self, spec: TableSpec) -> Self {
        self.tables.push(spec);
        self
    }

    /// Statement to run once before any table loads.
    #[must_use]
    pub fn setup(mut self, sql: impl Into<String>) -> Self {
        self.setup_sql = Some(sql.into());
        self
    }

    /// Statement to run once after all table loads, even on failure.
    #[must_use]
    pub fn cleanup(mut self, sql: impl Into<String>) -> Self {
        self.cleanup_sql = Some(sql.into());
        self
    }

    /// Install the family's per-row skip rule.
    ///
    /// The rule sees every parsed data row and answers keep-or-drop; dropped
    /// rows never reach the destination and are not errors. Without a rule,
    /// every row is kept.
    #[must_use]
    pub fn skip_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&RowView<'_>) -> RowAction + Send + Sync + 'static,
    {
        self.skip_rule = Some(Arc::new(rule));
        self
    }

    /// The family name, used in logs and reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tables to load, in order.
    #[must_use]
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// The setup statement, if configured.
    #[must_use]
    pub fn setup_sql(&self) -> Option<&str> {
        self.setup_sql.as_deref()
    }

    /// The cleanup statement, if configured.
    #[must_use]
    pub fn cleanup_sql(&self) -> Option<&str> {
        self.cleanup_sql.as_deref()
    }

    /// The installed skip rule, if any.
    #[must_use]
    pub fn skip(&self) -> Option<SkipRule> {
        self.skip_rule.clone()
    }

    /// Whether this family claims `path`'s filename.
    #[must_use]
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        self.pattern.is_match(&file_name(path.as_ref()))
    }

    /// Extract the file date embedded in `path`'s filename via the pattern's
    /// `date` capture.
    ///
    /// # Errors
    /// [`IngestError::BadFileDate`] if the pattern does not match, has no
    /// `date` capture, or the capture is not a `YYYYMMDD` date.
    pub fn file_date(&self, path: impl AsRef<Path>) -> Result<NaiveDate> {
        let name = file_name(path.as_ref());
        let bad = || IngestError::BadFileDate {
            filename: name.clone(),
        };
        let captures = self.pattern.captures(&name).ok_or_else(|| bad())?;
        let digits = captures.name("date").ok_or_else(|| bad())?.as_str();
        NaiveDate::parse_from_str(digits, "%Y%m%d").map_err(|_| bad().into())
    }
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("tables", &self.tables.len())
            .field("has_skip_rule", &self.skip_rule.is_some())
            .finish()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
