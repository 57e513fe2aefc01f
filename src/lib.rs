//! # Granary
//!
//! Batch ingestion of **compressed, delimited record files** into
//! **partitioned PostgreSQL tables**. Granary is the loading end of a batch
//! pipeline: files arrive in a spool directory named by convention
//! (`<family>.<YYYYMMDD>.csv.gz`), each invocation routes one file to its
//! loader, streams it through column projection and row filtering, and
//! merges it into the destination tables without duplicating existing rows.
//!
//! ## Key Features
//!
//! - **Filename dispatch** - regex patterns with an embedded `date` capture
//!   route each arriving file to its family's loader
//! - **Streaming projection** - one row in memory at a time, whatever the
//!   file size; injected skip rules drop sentinel rows in-flight
//! - **Staged atomic loads** - stage into a transaction-scoped temp relation,
//!   bulk-copy, then merge with a verbatim `ON CONFLICT` clause
//! - **On-demand partitions** - epoch-aligned date-range partitions created
//!   exactly when a file's date needs one
//! - **Guaranteed cleanup** - per-family setup/cleanup statements, with
//!   cleanup running even when a table load fails
//! - **Swappable database** - the core drives a capability trait; adapters
//!   and a recording mock plug in underneath
//!
//! ## Quick Start
//!
//! ```no_run
//! use granary::{Dispatcher, LoaderConfig, RowAction, TableSpec, ingest_file};
//! use granary::db::postgres::PostgresDatabase;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = LoaderConfig::new("post_stats", r"post_stats\.(?P<date>\d{8})\.csv\.gz$")?
//!     .skip_rule(|row| {
//!         if row.get("url") == Some("TOTAL") { RowAction::Skip } else { RowAction::Keep }
//!     })
//!     .table(
//!         TableSpec::new("sp_stats", ["url", "stat_name"])
//!             .map_column("url", "posts_url")
//!             .on_conflict("DO NOTHING")
//!             .partitioned("post_created_at", 7),
//!     );
//!
//! let dispatcher = Dispatcher::new(vec![config]);
//! let mut db = PostgresDatabase::connect_from_env()?;
//!
//! let stats = ingest_file(&mut db, &dispatcher, "/spool/post_stats.20240512.csv.gz")?;
//! println!("copied {} rows", stats.rows_copied);
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Model
//!
//! One file per invocation, strictly synchronous and sequential: tables load
//! in configured order, each over its own freshly decompressed stream and its
//! own transaction. Nothing here spawns threads or overlaps I/O: the
//! stage-and-merge transaction stays trivially atomic, and a hung external
//! call blocks a short-lived batch job, not a service.
//!
//! A failed table load fails the whole run (after cleanup), but earlier
//! tables' commits stand: each table's transaction is independent and is
//! never rolled back by a later failure.
//!
//! ## Feature Flags
//!
//! - `db-postgres` *(default)* - PostgreSQL adapter for the database
//!   capability, on the blocking `postgres` client
//! - `compression-gzip` *(default)* - gzip source decompression
//! - `compression-zstd` - zstd source decompression
//! - `metrics` *(default)* - timed, JSON-exportable load reports
//!
//! ## Module Overview
//!
//! - [`config`] - `LoaderConfig` / `TableSpec`: what each file family loads
//! - [`picker`] - streaming record selection and re-serialization
//! - [`partition`] - on-demand range-partition management
//! - [`load`] - the staged bulk-load protocol
//! - [`ingest`] - the per-file orchestrator
//! - [`dispatch`] - filename-to-loader dispatch and [`ingest_file`]
//! - [`db`] - the database capability traits and adapters
//! - [`io`] - source decompression and spool listing
//! - [`metrics`] - run counters and reports
//! - [`testing`] - recording mock database and spool fixtures

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod io;
pub mod load;
pub mod metrics;
pub mod partition;
pub mod picker;
pub mod testing;

// General re-exports
pub use config::{LoaderConfig, TableSpec};
pub use dispatch::{Dispatcher, ingest_file};
pub use error::IngestError;
pub use ingest::Loader;
pub use load::bulk_load;
pub use metrics::IngestStats;
pub use partition::ensure_partition;
pub use picker::{RecordPicker, RowAction, RowView, SkipRule};

// Gated re-exports
#[cfg(feature = "db-postgres")]
pub use db::postgres::PostgresDatabase;

#[cfg(feature = "metrics")]
pub use metrics::LoadReport;
