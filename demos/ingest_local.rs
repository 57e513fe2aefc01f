//! Ingest a spool directory of arrival files into PostgreSQL.
//!
//! This demo shows the full loading path:
//! - A dispatcher built from one file-family configuration
//! - Spool listing to find waiting files
//! - One `ingest_file` call per file, with a load report per run
//!
//! Connection parameters come from the usual `PGHOST`/`PGPORT`/`PGUSER`/
//! `PGPASSWORD`/`PGDATABASE` environment variables.
//!
//! Run with: `cargo run --example ingest_local -- /var/spool/stats`

use anyhow::Result;
use granary::db::postgres::PostgresDatabase;
use granary::io::spool::pending_files;
use granary::metrics::LoadReport;
use granary::{Dispatcher, LoaderConfig, RowAction, TableSpec, ingest_file};
use tracing::{error, info};

fn dispatcher() -> Result<Dispatcher> {
    let post_stats = LoaderConfig::new("post_stats", r"post_stats\.(?P<date>\d{8})\.csv\.gz$")?
        .skip_rule(|row| {
            // The export tool appends a TOTAL summary row; it is not data.
            if row.get("url") == Some("TOTAL") {
                RowAction::Skip
            } else {
                RowAction::Keep
            }
        })
        .table(
            TableSpec::new("sp_stats", ["url", "stat_name", "stat_value"])
                .map_column("url", "posts_url")
                .on_conflict("DO NOTHING")
                .partitioned("post_created_at", 7),
        );

    let user_stats = LoaderConfig::new("user_stats", r"user_stats\.(?P<date>\d{8})\.csv\.gz$")?
        .setup("SELECT pg_advisory_lock(815001)")
        .cleanup("SELECT pg_advisory_unlock(815001)")
        .table(TableSpec::new("su_stats", ["user_id", "follower_count"]));

    Ok(Dispatcher::new(vec![post_stats, user_stats]))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let spool = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/var/spool/stats".to_string());
    let dispatcher = dispatcher()?;
    let mut db = PostgresDatabase::connect_from_env()?;

    let mut failures = 0usize;
    for path in pending_files(&format!("{spool}/*.csv.gz"))? {
        let mut report = LoadReport::start(path.display().to_string());
        match ingest_file(&mut db, &dispatcher, &path) {
            Ok(stats) => {
                report.finish(stats);
                report.print();
            }
            Err(e) => {
                // One bad file must not stop the rest of the spool.
                error!(file = %path.display(), error = %e, "ingest failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed to ingest");
    }
    info!("spool drained");
    Ok(())
}
