//! The staged bulk-load protocol: stage, copy, merge, atomically.
//!
//! [`bulk_load`] moves one picker's output into one destination table without
//! ever inserting into it directly:
//!
//! 1. `CREATE TEMP TABLE <table>_ingest (LIKE <table> INCLUDING DEFAULTS)
//!    ON COMMIT DROP`: a staging relation shaped like the destination, whose
//!    release is owned by the transaction boundary itself.
//! 2. `COPY <table>_ingest (<columns>) FROM STDIN (FORMAT csv)` fed from the
//!    picker's byte stream.
//! 3. `INSERT INTO <table> SELECT * FROM <table>_ingest ON CONFLICT <clause>`
//!    with the clause applied verbatim.
//!
//! All three run inside a single transaction scope: either every surviving
//! row merges (subject to the conflict clause) or none do.

use crate::db::Database;
use crate::error::IngestError;
use crate::picker::RecordPicker;
use anyhow::Result;
use tracing::debug;

/// Stage `picker`'s stream into `table` and merge it, in one transaction.
///
/// Returns the number of rows copied into the staging relation. Zero rows is
/// not an error; the staging relation is created and dropped with no effect.
///
/// # Errors
/// [`IngestError::ColumnCountMismatch`] if `destination_columns` and the
/// picker's projection disagree in arity, checked before any statement runs
/// so a misconfigured load never partially stages. Any failure inside the
/// three steps rolls the transaction back and propagates.
pub fn bulk_load(
    db: &mut dyn Database,
    picker: &mut RecordPicker,
    table: &str,
    destination_columns: &[String],
    on_conflict: &str,
) -> Result<u64> {
    if picker.width() != destination_columns.len() {
        return Err(IngestError::ColumnCountMismatch {
            table: table.to_string(),
            expected: destination_columns.len(),
            actual: picker.width(),
        }
        .into());
    }

    let staging = format!("{table}_ingest");
    let mut tx = db.begin()?;

    tx.execute(&format!(
        "CREATE TEMP TABLE {staging} (LIKE {table} INCLUDING DEFAULTS) ON COMMIT DROP"
    ))?;

    let copy = format!(
        "COPY {staging} ({}) FROM STDIN (FORMAT csv)",
        destination_columns.join(", ")
    );
    let rows = tx.copy_in(&copy, picker)?;
    debug!(table, rows, "staged");

    tx.execute(&format!(
        "INSERT INTO {table} SELECT * FROM {staging} ON CONFLICT {on_conflict}"
    ))?;

    tx.commit()?;
    Ok(rows)
}
