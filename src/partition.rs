//! On-demand range-partition management.
//!
//! Destination tables may be range-partitioned on a date column. Before a
//! file's rows can merge, a partition covering the file date must exist;
//! [`ensure_partition`] checks and, when needed, creates it.
//!
//! Intervals are epoch-aligned: every partition spans
//! `[lower, lower + range_days)` where `lower` is the record date rounded
//! down to a whole multiple of `range_days` from the CE epoch. Alignment is a
//! property of the arithmetic, not of call order, so two runs can never carve
//! overlapping partitions out of the same table.
//!
//! Partitions are named `<table>_p<YYYYMMDD>` after their lower bound.

use crate::db::Database;
use crate::error::IngestError;
use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, info};

/// The date interval `[lower, upper)` a partition covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionBounds {
    /// Inclusive lower bound.
    pub lower: NaiveDate,
    /// Exclusive upper bound.
    pub upper: NaiveDate,
}

/// Compute the epoch-aligned interval of width `range_days` covering `date`.
#[must_use]
pub fn covering_bounds(date: NaiveDate, range_days: u32) -> PartitionBounds {
    // rem_euclid keeps the offset in [0, range_days) even for pre-CE dates.
    let offset = i64::from(date.num_days_from_ce()).rem_euclid(i64::from(range_days));
    let lower = date - Days::new(offset.unsigned_abs());
    let upper = lower + Days::new(u64::from(range_days));
    PartitionBounds { lower, upper }
}

/// The deterministic name of `table`'s partition with lower bound `lower`.
#[must_use]
pub fn partition_name(table: &str, lower: NaiveDate) -> String {
    format!("{table}_p{}", lower.format("%Y%m%d"))
}

/// Make sure a partition of `table` covering `record_date` exists, creating
/// it if necessary, and return its name.
///
/// The currently furthest-advanced bound is read back with
/// `SELECT max(<column>)`; if its interval already reaches `record_date`'s,
/// the existing partition name is returned and no DDL runs. An empty lookup
/// (no rows, or SQL NULL on a fresh table) always creates. Creation itself is
/// `CREATE TABLE IF NOT EXISTS .. PARTITION OF ..`, so a concurrent run
/// creating the same partition is absorbed by the database rather than
/// failing the load.
///
/// # Errors
/// [`IngestError::PartitionStateUnknown`] when the lookup returns a row that
/// lacks the partition column entirely; the manager refuses to guess between
/// "create" and "already covered". DDL failures propagate as this table's
/// load failure.
pub fn ensure_partition(
    db: &mut dyn Database,
    table: &str,
    record_date: NaiveDate,
    partition_column: &str,
    range_days: u32,
) -> Result<String> {
    let bounds = covering_bounds(record_date, range_days);
    let name = partition_name(table, bounds.lower);

    let lookup = format!("SELECT max({partition_column}) AS {partition_column} FROM {table}");
    debug!(table, %record_date, "partition bound lookup");
    let rows = db.execute(&lookup)?;

    if let Some(row) = rows.first() {
        let Some(value) = row.get(partition_column) else {
            return Err(IngestError::PartitionStateUnknown {
                table: table.to_string(),
                column: partition_column.to_string(),
            }
            .into());
        };
        if let Some(bound) = value.as_date()
            && bound >= bounds.lower
        {
            debug!(table, partition = %name, "partition already covers date");
            return Ok(name);
        }
        // Present but NULL (or a non-date) means the table holds no usable
        // bound yet; fall through and create.
    }

    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {name} PARTITION OF {table} \
         FOR VALUES FROM ('{}') TO ('{}')",
        bounds.lower, bounds.upper
    );
    db.execute(&ddl)?;
    info!(table, partition = %name, lower = %bounds.lower, upper = %bounds.upper, "partition created");
    Ok(name)
}
