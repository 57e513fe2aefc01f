use granary::picker::{RecordPicker, RowAction, SkipRule};
use granary::IngestError;
use std::io::{Cursor, Read};
use std::sync::Arc;

fn source(text: &str) -> Box<dyn Read> {
    Box::new(Cursor::new(text.to_string()))
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn projects_requested_columns_in_order() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(source("a,b,c\n1,2,3\n"), &fields(&["a", "c"]), None)?;
    assert_eq!(picker.next_chunk()?, Some("1,3\r\n".to_string()));
    assert_eq!(picker.next_chunk()?, None);
    Ok(())
}

#[test]
fn projection_order_follows_caller_not_source() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(source("a,b,c\n1,2,3\n"), &fields(&["c", "a"]), None)?;
    assert_eq!(picker.next_chunk()?, Some("3,1\r\n".to_string()));
    Ok(())
}

#[test]
fn header_only_source_reads_to_empty() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(source("a,b,c\n"), &fields(&["a"]), None)?;
    assert_eq!(picker.next_chunk()?, None);
    // EOF is a stable sentinel, not a one-shot.
    assert_eq!(picker.next_chunk()?, None);
    Ok(())
}

#[test]
fn quotes_fields_containing_delimiters() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(
        source("a,b\n\"x,y\",plain\n"),
        &fields(&["a", "b"]),
        None,
    )?;
    assert_eq!(picker.next_chunk()?, Some("\"x,y\",plain\r\n".to_string()));
    Ok(())
}

#[test]
fn escapes_embedded_quotes() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(
        source("a\n\"say \"\"hi\"\"\"\n"),
        &fields(&["a"]),
        None,
    )?;
    assert_eq!(picker.next_chunk()?, Some("\"say \"\"hi\"\"\"\r\n".to_string()));
    Ok(())
}

#[test]
fn skip_rule_drops_flagged_rows_only() -> anyhow::Result<()> {
    let rule: SkipRule = Arc::new(|row| {
        if row.get("a") == Some("SKIP") {
            RowAction::Skip
        } else {
            RowAction::Keep
        }
    });
    let mut picker = RecordPicker::new(
        source("a,b,c\nSKIP,2,3\n1,2,3\n"),
        &fields(&["a", "c"]),
        Some(rule),
    )?;
    assert_eq!(picker.next_chunk()?, Some("1,3\r\n".to_string()));
    assert_eq!(picker.next_chunk()?, None);
    assert_eq!(picker.skipped(), 1);
    Ok(())
}

#[test]
fn skip_on_last_row_emits_no_trailing_chunk() -> anyhow::Result<()> {
    let rule: SkipRule = Arc::new(|row| {
        if row.get("a") == Some("SKIP") {
            RowAction::Skip
        } else {
            RowAction::Keep
        }
    });
    let mut picker = RecordPicker::new(
        source("a,b\n1,2\nSKIP,9\n"),
        &fields(&["b"]),
        Some(rule),
    )?;
    assert_eq!(picker.next_chunk()?, Some("2\r\n".to_string()));
    assert_eq!(picker.next_chunk()?, None);
    Ok(())
}

#[test]
fn survivors_retain_relative_order() -> anyhow::Result<()> {
    let rule: SkipRule = Arc::new(|row| {
        if row.get("a") == Some("SKIP") {
            RowAction::Skip
        } else {
            RowAction::Keep
        }
    });
    let mut picker = RecordPicker::new(
        source("a\nfirst\nSKIP\nsecond\nSKIP\nthird\n"),
        &fields(&["a"]),
        Some(rule),
    )?;
    let mut lines = Vec::new();
    while let Some(line) = picker.next_chunk()? {
        lines.push(line);
    }
    assert_eq!(lines, vec!["first\r\n", "second\r\n", "third\r\n"]);
    assert_eq!(picker.skipped(), 2);
    Ok(())
}

#[test]
fn missing_wanted_column_fails_construction() {
    let err = RecordPicker::new(source("a,b\n1,2\n"), &fields(&["nope"]), None)
        .err()
        .expect("construction must fail");
    match err.downcast_ref::<IngestError>() {
        Some(IngestError::MissingColumn { column }) => assert_eq!(column, "nope"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_row_is_an_error_not_a_skip() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(source("a,b\n1,2\nonly_one\n"), &fields(&["a"]), None)?;
    assert_eq!(picker.next_chunk()?, Some("1\r\n".to_string()));
    assert!(picker.next_chunk().is_err());
    Ok(())
}

#[test]
fn read_adapter_streams_all_surviving_lines() -> anyhow::Result<()> {
    let mut picker = RecordPicker::new(
        source("a,b\n1,2\n3,4\n"),
        &fields(&["b", "a"]),
        None,
    )?;
    let mut out = String::new();
    picker.read_to_string(&mut out)?;
    assert_eq!(out, "2,1\r\n4,3\r\n");
    Ok(())
}

#[test]
fn width_reports_projection_arity() -> anyhow::Result<()> {
    let picker = RecordPicker::new(source("a,b,c\n"), &fields(&["a", "c"]), None)?;
    assert_eq!(picker.width(), 2);
    Ok(())
}
