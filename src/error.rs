//! Typed failure conditions for ingestion runs.
//!
//! Everything in this crate travels as [`anyhow::Error`]; the variants here
//! are the conditions callers are expected to branch on, so they are concrete
//! types that can be recovered with `err.downcast_ref::<IngestError>()`.
//!
//! Three families matter to an embedding process:
//! - **Configuration errors** ([`IngestError::NoLoaderFound`],
//!   [`IngestError::MissingColumn`], [`IngestError::ColumnCountMismatch`],
//!   [`IngestError::InvalidSpec`], [`IngestError::BadFileDate`]) are fatal and
//!   not worth retrying; the file or the loader table is wrong.
//! - [`IngestError::PartitionStateUnknown`] means the partition-bound lookup
//!   returned a row without the expected column. The true partition state is
//!   unclear, so the run stops instead of guessing between "create" and
//!   "already covered".
//! - Everything else (connectivity, decompression, merge conflicts outside the
//!   conflict clause) propagates as plain `anyhow` errors with context.

use std::fmt;

/// A condition an ingestion run can fail with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// No registered loader's filename pattern matched the path.
    NoLoaderFound {
        /// The filename that failed to match.
        filename: String,
    },
    /// A wanted source column is absent from the file's header row.
    MissingColumn {
        /// The column name requested in `csv_columns`.
        column: String,
    },
    /// The destination column list and the picker's projection disagree in arity.
    ColumnCountMismatch {
        /// Destination table name.
        table: String,
        /// Number of destination columns.
        expected: usize,
        /// Number of projected source fields.
        actual: usize,
    },
    /// A `TableSpec` is structurally invalid.
    InvalidSpec {
        /// Destination table name.
        table: String,
        /// What is wrong with the spec.
        reason: String,
    },
    /// The filename matched but its embedded date could not be extracted.
    BadFileDate {
        /// The filename the date was expected in.
        filename: String,
    },
    /// The partition-bound lookup returned a row without the expected field.
    ///
    /// Deliberately distinct from "no partition exists": an empty lookup
    /// creates a partition, an incomplete one stops the run.
    PartitionStateUnknown {
        /// Destination table name.
        table: String,
        /// The partition key column that was missing from the result.
        column: String,
    },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLoaderFound { filename } => {
                write!(f, "no loader registered for filename '{filename}'")
            }
            Self::MissingColumn { column } => {
                write!(f, "source header has no column '{column}'")
            }
            Self::ColumnCountMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "table '{table}': {expected} destination columns but {actual} projected fields"
            ),
            Self::InvalidSpec { table, reason } => {
                write!(f, "invalid spec for table '{table}': {reason}")
            }
            Self::BadFileDate { filename } => {
                write!(f, "could not extract a file date from '{filename}'")
            }
            Self::PartitionStateUnknown { table, column } => write!(
                f,
                "partition state of '{table}' unknown: bound lookup returned no '{column}' field"
            ),
        }
    }
}

impl std::error::Error for IngestError {}
