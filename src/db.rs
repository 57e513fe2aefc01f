//! The database capability the ingestion core runs against.
//!
//! The core never talks to a driver directly. It needs exactly three things
//! from the relational engine, and this module states them as traits:
//!
//! - statement execution returning rows ([`Database::execute`]),
//! - a transaction scope with commit-on-success semantics
//!   ([`Database::begin`] / [`Transaction`]),
//! - a raw bulk-copy channel accepting pre-formatted delimited lines
//!   ([`Transaction::copy_in`]).
//!
//! Anything implementing [`Database`] can sit behind a loader: the shipped
//! PostgreSQL adapter (feature `db-postgres`, see [`crate::db::postgres`]),
//! or the recording mock in [`crate::testing`] for tests.
//!
//! Result rows come back as [`Row`] over a small [`SqlValue`] model, just
//! wide enough for what the core inspects (partition-bound lookups), not a
//! general value system.

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use std::env;
use std::io::Read;

#[cfg(feature = "db-postgres")]
pub mod postgres;

/// A single column value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Text and anything the driver could only render as text.
    Text(String),
    /// Integer types.
    Int(i64),
    /// Floating-point types.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// DATE.
    Date(NaiveDate),
    /// TIMESTAMP without time zone.
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    /// The calendar date carried by this value, if it has one.
    ///
    /// Timestamps contribute their date part; everything else is `None`.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Timestamp(ts) => Some(ts.date()),
            _ => None,
        }
    }

    /// Whether this value is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// One result row: column names paired positionally with values.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Build a row from parallel column/value lists.
    ///
    /// # Panics
    /// Panics if the two lists differ in length; rows are driver-constructed
    /// and a mismatch is a driver bug, not a runtime condition.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        assert_eq!(columns.len(), values.len(), "row shape mismatch");
        Self { columns, values }
    }

    /// Look a value up by column name.
    ///
    /// `None` means the column is not present in the row at all, a different
    /// condition from a present-but-NULL value, and the one the partition
    /// manager treats as "state unknown".
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Column names in positional order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// An open transaction scope.
///
/// Dropping a transaction without calling [`commit`](Transaction::commit)
/// rolls it back; every adapter must uphold that, since the staged bulk load
/// leans on rollback-on-error for its atomicity.
pub trait Transaction {
    /// Execute one statement inside the transaction and return its rows.
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Feed a bulk-copy statement from a stream of pre-formatted delimited
    /// lines. Returns the number of rows copied.
    fn copy_in(&mut self, sql: &str, source: &mut dyn Read) -> Result<u64>;

    /// Commit the transaction.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// A live database connection.
pub trait Database {
    /// Execute one statement outside any explicit transaction and return its
    /// rows. Statements that produce no rows return an empty vector.
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Open a transaction scope.
    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>>;
}

/// Connection parameters, sourced from the process environment.
///
/// The conventional PostgreSQL variables are consumed as-is: `PGHOST`
/// (required), `PGPORT` (default 5432), `PGUSER`, `PGPASSWORD`, `PGDATABASE`.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Database host.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Role name, if set.
    pub user: Option<String>,
    /// Password, if set.
    pub password: Option<String>,
    /// Database name, if set.
    pub dbname: Option<String>,
}

impl ConnectConfig {
    /// Read connection parameters from the environment.
    ///
    /// # Errors
    /// Fails if `PGHOST` is unset or `PGPORT` is not a valid port number.
    pub fn from_env() -> Result<Self> {
        let host = env::var("PGHOST").map_err(|_| anyhow::anyhow!("PGHOST is not set"))?;
        let port = match env::var("PGPORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("PGPORT '{p}' is not a valid port"))?,
            Err(_) => 5432,
        };
        Ok(Self {
            host,
            port,
            user: env::var("PGUSER").ok(),
            password: env::var("PGPASSWORD").ok(),
            dbname: env::var("PGDATABASE").ok(),
        })
    }
}
