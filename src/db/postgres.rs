//! PostgreSQL adapter for the database capability.
//!
//! Wraps the blocking [`postgres`] client behind [`Database`] /
//! [`Transaction`]. The ingestion core is strictly synchronous, so the
//! blocking facade is the right fit; no pooling, since each run owns exactly one
//! connection, per the one-file-per-invocation model.

use crate::db::{ConnectConfig, Database, Row, SqlValue, Transaction};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use postgres::{Client, NoTls};
use std::io::Read;

/// A live PostgreSQL connection implementing the ingestion capability.
pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    /// Connect with explicit parameters.
    ///
    /// # Errors
    /// Fails if the connection cannot be established.
    pub fn connect(config: &ConnectConfig) -> Result<Self> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host).port(config.port);
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        if let Some(dbname) = &config.dbname {
            pg.dbname(dbname);
        }
        let client = pg
            .connect(NoTls)
            .with_context(|| format!("connect to postgres at {}:{}", config.host, config.port))?;
        Ok(Self { client })
    }

    /// Connect with parameters read from the `PG*` environment variables.
    ///
    /// # Errors
    /// Fails if `PGHOST` is unset or the connection cannot be established.
    pub fn connect_from_env() -> Result<Self> {
        Self::connect(&ConnectConfig::from_env()?)
    }
}

impl Database for PostgresDatabase {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        let rows = self
            .client
            .query(sql, &[])
            .with_context(|| format!("execute: {sql}"))?;
        Ok(rows.iter().map(convert_row).collect())
    }

    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>> {
        let tx = self.client.transaction().context("begin transaction")?;
        Ok(Box::new(PostgresTransaction { tx }))
    }
}

struct PostgresTransaction<'a> {
    tx: postgres::Transaction<'a>,
}

impl Transaction for PostgresTransaction<'_> {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        let rows = self
            .tx
            .query(sql, &[])
            .with_context(|| format!("execute in transaction: {sql}"))?;
        Ok(rows.iter().map(convert_row).collect())
    }

    fn copy_in(&mut self, sql: &str, source: &mut dyn Read) -> Result<u64> {
        let mut writer = self
            .tx
            .copy_in(sql)
            .with_context(|| format!("open copy channel: {sql}"))?;
        std::io::copy(source, &mut writer).context("stream rows into copy channel")?;
        writer.finish().context("finish copy")
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().context("commit transaction")
    }
}

/// Convert a driver row into the capability's [`Row`] model.
///
/// Values are recovered with a typed try-get cascade; a column no branch can
/// decode comes back as [`SqlValue::Null`] rather than failing the whole row,
/// since the core only ever inspects the columns it asked for by name.
fn convert_row(row: &postgres::Row) -> Row {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (idx, col) in row.columns().iter().enumerate() {
        columns.push(col.name().to_string());
        values.push(convert_value(row, idx));
    }
    Row::new(columns, values)
}

fn convert_value(row: &postgres::Row, idx: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<_, Option<NaiveDate>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Date);
    }
    if let Ok(v) = row.try_get::<_, Option<NaiveDateTime>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Timestamp);
    }
    if let Ok(v) = row.try_get::<_, Option<i64>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Int);
    }
    if let Ok(v) = row.try_get::<_, Option<i32>>(idx) {
        return v.map_or(SqlValue::Null, |n| SqlValue::Int(n.into()));
    }
    if let Ok(v) = row.try_get::<_, Option<f64>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Float);
    }
    if let Ok(v) = row.try_get::<_, Option<bool>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Bool);
    }
    if let Ok(v) = row.try_get::<_, Option<String>>(idx) {
        return v.map_or(SqlValue::Null, SqlValue::Text);
    }
    SqlValue::Null
}
