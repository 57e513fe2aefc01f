//! Streaming record selection: project, filter, re-serialize.
//!
//! [`RecordPicker`] turns a raw delimited-text source into the exact stream
//! the bulk-copy channel wants: one CRLF-terminated line per surviving row,
//! containing only the requested columns, in the requested order, with
//! delimiters and quotes escaped correctly. It holds one row in memory at a
//! time, so source size never bounds the load.
//!
//! The pull API is [`next_chunk`](RecordPicker::next_chunk): `Ok(Some(line))`
//! per row, then `Ok(None)` exactly once at end of stream, the same EOF
//! convention as the copy channel it feeds. A [`Read`] impl adapts the picker
//! for `COPY .. FROM STDIN` without materializing the stream.
//!
//! Row filtering is an injected [`SkipRule`]: the rule sees a [`RowView`] of
//! the parsed row and answers [`RowAction::Keep`] or [`RowAction::Skip`].
//! A skip is a control signal, not an error: it is consumed here and never
//! observed downstream. Malformed rows (wrong field count) are a parse error
//! and do propagate.

use crate::error::IngestError;
use anyhow::{Context, Result};
use csv::{ByteRecord, Terminator, WriterBuilder};
use std::io::Read;
use std::sync::Arc;

/// Verdict of a [`SkipRule`] for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    /// Emit the row.
    Keep,
    /// Drop the row and continue with the next one.
    Skip,
}

/// A per-row keep-or-drop predicate, injected via
/// [`LoaderConfig::skip_rule`](crate::LoaderConfig::skip_rule).
pub type SkipRule = Arc<dyn Fn(&RowView<'_>) -> RowAction + Send + Sync>;

/// Borrowed view of one parsed source row, valid for a single rule call.
///
/// Fields are addressed by header name, so rules read like the business
/// statements they encode: `row.get("url") == Some("TOTAL")`.
pub struct RowView<'a> {
    headers: &'a [String],
    record: &'a ByteRecord,
}

impl RowView<'_> {
    /// The value of `column` in this row, or `None` if the header has no such
    /// column or the value is not valid UTF-8.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.record.get(idx).and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// Streaming column projection over a delimited-text source.
pub struct RecordPicker {
    reader: csv::Reader<Box<dyn Read>>,
    headers: Vec<String>,
    indices: Vec<usize>,
    skip: Option<SkipRule>,
    record: ByteRecord,
    row_number: u64,
    skipped: u64,
    // unread tail of the last chunk, for the Read adapter
    pending: Vec<u8>,
}

impl RecordPicker {
    /// Build a picker over `source`, projecting `fields` in the given order.
    ///
    /// The header row is parsed eagerly to resolve each wanted field to its
    /// column index.
    ///
    /// # Errors
    /// Fails if the header row cannot be read or if any wanted field is
    /// absent from it ([`IngestError::MissingColumn`]).
    pub fn new(source: Box<dyn Read>, fields: &[String], skip: Option<SkipRule>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(source);
        let headers: Vec<String> = reader
            .headers()
            .context("read header row")?
            .iter()
            .map(str::to_string)
            .collect();
        let indices = fields
            .iter()
            .map(|f| {
                headers.iter().position(|h| h == f).ok_or_else(|| {
                    anyhow::Error::from(IngestError::MissingColumn { column: f.clone() })
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            reader,
            headers,
            indices,
            skip,
            record: ByteRecord::new(),
            row_number: 0,
            skipped: 0,
            pending: Vec::new(),
        })
    }

    /// Number of projected fields per output line.
    #[must_use]
    pub fn width(&self) -> usize {
        self.indices.len()
    }

    /// Rows dropped by the skip rule so far.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Pull the next re-serialized line, or `Ok(None)` once at end of stream.
    ///
    /// Each returned line carries exactly the projected fields, in projection
    /// order, CRLF-terminated, quoted as the copy format requires.
    ///
    /// # Errors
    /// Malformed rows (unequal field counts, invalid UTF-8 in a projected
    /// field) surface here with their row number; they are never silently
    /// dropped.
    pub fn next_chunk(&mut self) -> Result<Option<String>> {
        loop {
            let more = self
                .reader
                .read_byte_record(&mut self.record)
                .with_context(|| format!("parse record #{}", self.row_number + 1))?;
            if !more {
                return Ok(None);
            }
            self.row_number += 1;

            if let Some(rule) = &self.skip {
                let view = RowView {
                    headers: &self.headers,
                    record: &self.record,
                };
                if rule(&view) == RowAction::Skip {
                    self.skipped += 1;
                    continue;
                }
            }

            return self.project().map(Some);
        }
    }

    /// Re-serialize the projected fields of the current record as one line.
    fn project(&self) -> Result<String> {
        let mut out = ByteRecord::new();
        for &idx in &self.indices {
            let field = self.record.get(idx).ok_or_else(|| {
                anyhow::anyhow!(
                    "record #{} has {} fields, expected at least {}",
                    self.row_number,
                    self.record.len(),
                    idx + 1
                )
            })?;
            out.push_field(field);
        }
        let mut buf = Vec::with_capacity(64);
        {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .terminator(Terminator::CRLF)
                .from_writer(&mut buf);
            writer.write_byte_record(&out)?;
            writer.flush()?;
        }
        String::from_utf8(buf)
            .with_context(|| format!("record #{} is not valid UTF-8", self.row_number))
    }
}

/// Feed the picker's output into a byte sink, one projected line at a time.
///
/// This is what lets a picker be handed straight to
/// [`Transaction::copy_in`](crate::db::Transaction::copy_in).
impl Read for RecordPicker {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pending.is_empty() {
            match self.next_chunk() {
                Ok(Some(line)) => self.pending = line.into_bytes(),
                Ok(None) => return Ok(0),
                Err(e) => return Err(std::io::Error::other(e)),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}
