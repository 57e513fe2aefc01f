//! Test doubles for loader configurations and pipelines.
//!
//! Exercising a loader does not need a running database or a real spool
//! directory:
//!
//! - [`MockDatabase`] implements the [`Database`](crate::db::Database)
//!   capability by recording every statement and copy payload it is handed.
//!   Query results can be scripted in advance and failures injected by
//!   substring, so tests assert on exactly the SQL a load emits.
//! - [`SpoolDir`] is a temporary arrival directory for writing
//!   convention-named fixture files, plain or gzipped.
//!
//! Both are shipped (not `#[cfg(test)]`) so downstream crates can test their
//! own loader configurations the same way this crate tests itself.

use crate::db::{Database, Row, Transaction};
use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A recording, scriptable stand-in for a live database.
#[derive(Default)]
pub struct MockDatabase {
    statements: Vec<String>,
    copies: Vec<(String, String)>,
    query_results: VecDeque<Vec<Row>>,
    commits: usize,
    fail_matching: Option<String>,
}

impl MockDatabase {
    /// A mock that answers every query with no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `SELECT` to answer with `rows`.
    ///
    /// Responses queue in call order; once the queue drains, queries go back
    /// to answering with no rows.
    pub fn respond_with(&mut self, rows: Vec<Row>) {
        self.query_results.push_back(rows);
    }

    /// Make any statement containing `needle` fail.
    pub fn fail_on(&mut self, needle: impl Into<String>) {
        self.fail_matching = Some(needle.into());
    }

    /// Every statement executed, direct or transactional, in order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Every copy performed, as `(copy statement, payload)` pairs.
    #[must_use]
    pub fn copies(&self) -> &[(String, String)] {
        &self.copies
    }

    /// Number of committed transactions.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits
    }

    fn run(&mut self, sql: &str) -> Result<Vec<Row>> {
        if let Some(needle) = &self.fail_matching
            && sql.contains(needle.as_str())
        {
            bail!("injected failure for statement: {sql}");
        }
        self.statements.push(sql.to_string());
        if sql.trim_start().to_uppercase().starts_with("SELECT") {
            return Ok(self.query_results.pop_front().unwrap_or_default());
        }
        Ok(Vec::new())
    }
}

impl Database for MockDatabase {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.run(sql)
    }

    fn begin(&mut self) -> Result<Box<dyn Transaction + '_>> {
        Ok(Box::new(MockTransaction { db: self }))
    }
}

struct MockTransaction<'a> {
    db: &'a mut MockDatabase,
}

impl Transaction for MockTransaction<'_> {
    fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.db.run(sql)
    }

    fn copy_in(&mut self, sql: &str, source: &mut dyn Read) -> Result<u64> {
        if let Some(needle) = &self.db.fail_matching
            && sql.contains(needle.as_str())
        {
            bail!("injected failure for copy: {sql}");
        }
        let mut payload = String::new();
        source.read_to_string(&mut payload)?;
        let rows = payload.lines().count() as u64;
        self.db.statements.push(sql.to_string());
        self.db.copies.push((sql.to_string(), payload));
        Ok(rows)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.db.commits += 1;
        Ok(())
    }
}

/// A temporary arrival directory for convention-named fixture files.
///
/// Deleted with everything in it when dropped.
pub struct SpoolDir {
    dir: TempDir,
}

impl SpoolDir {
    /// Create an empty spool directory.
    ///
    /// # Errors
    /// Fails if the temporary directory cannot be created.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The path a file named `name` would have in this spool.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a plain-text fixture named `name` and return its path.
    ///
    /// # Errors
    /// Fails on file I/O errors.
    pub fn write_plain(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.file(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a gzip-compressed fixture named `name` and return its path.
    ///
    /// # Errors
    /// Fails on file I/O errors.
    #[cfg(feature = "compression-gzip")]
    pub fn write_gzip(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let path = self.file(name);
        let file = std::fs::File::create(&path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content.as_bytes())?;
        encoder.finish()?;
        Ok(path)
    }
}
