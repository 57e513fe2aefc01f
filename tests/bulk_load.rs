use granary::picker::RecordPicker;
use granary::testing::MockDatabase;
use granary::{bulk_load, IngestError};
use std::io::{Cursor, Read};

fn picker(text: &str, fields: &[&str]) -> RecordPicker {
    let source: Box<dyn Read> = Box::new(Cursor::new(text.to_string()));
    let fields: Vec<String> = fields.iter().map(|s| s.to_string()).collect();
    RecordPicker::new(source, &fields, None).expect("picker over fixture")
}

fn dest(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn emits_stage_copy_merge_in_order() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    let mut p = picker("foo,bar,baz\n1,2,3\n", &["foo", "bar", "baz"]);

    let rows = bulk_load(
        &mut db,
        &mut p,
        "some_table",
        &dest(&["foo", "bar", "baz"]),
        "DO NOTHING",
    )?;

    assert_eq!(rows, 1);
    assert_eq!(
        db.statements(),
        &[
            "CREATE TEMP TABLE some_table_ingest (LIKE some_table INCLUDING DEFAULTS) ON COMMIT DROP",
            "COPY some_table_ingest (foo, bar, baz) FROM STDIN (FORMAT csv)",
            "INSERT INTO some_table SELECT * FROM some_table_ingest ON CONFLICT DO NOTHING",
        ]
    );
    assert_eq!(db.commits(), 1);
    Ok(())
}

#[test]
fn copy_payload_is_the_projected_stream() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    let mut p = picker("a,b,c\n1,2,3\n4,5,6\n", &["c", "a"]);

    bulk_load(&mut db, &mut p, "t", &dest(&["c", "a"]), "DO NOTHING")?;

    let (sql, payload) = &db.copies()[0];
    assert_eq!(sql, "COPY t_ingest (c, a) FROM STDIN (FORMAT csv)");
    assert_eq!(payload, "3,1\r\n6,4\r\n");
    Ok(())
}

#[test]
fn conflict_clause_passes_through_verbatim() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    let mut p = picker("k,v\n1,2\n", &["k", "v"]);

    bulk_load(
        &mut db,
        &mut p,
        "t",
        &dest(&["k", "v"]),
        "(k) DO UPDATE SET v = EXCLUDED.v",
    )?;

    assert_eq!(
        db.statements().last().map(String::as_str),
        Some("INSERT INTO t SELECT * FROM t_ingest ON CONFLICT (k) DO UPDATE SET v = EXCLUDED.v")
    );
    Ok(())
}

#[test]
fn empty_stream_is_not_an_error() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    let mut p = picker("a,b\n", &["a", "b"]);

    let rows = bulk_load(&mut db, &mut p, "t", &dest(&["a", "b"]), "DO NOTHING")?;

    assert_eq!(rows, 0);
    // The staging relation is still created and the merge still runs.
    assert_eq!(db.statements().len(), 3);
    assert_eq!(db.commits(), 1);
    Ok(())
}

#[test]
fn column_count_mismatch_fails_before_any_statement() {
    let mut db = MockDatabase::new();
    let mut p = picker("a,b\n1,2\n", &["a", "b"]);

    let err = bulk_load(&mut db, &mut p, "t", &dest(&["a", "b", "c"]), "DO NOTHING")
        .err()
        .expect("arity mismatch must fail");
    match err.downcast_ref::<IngestError>() {
        Some(IngestError::ColumnCountMismatch {
            table,
            expected,
            actual,
        }) => {
            assert_eq!(table, "t");
            assert_eq!(*expected, 3);
            assert_eq!(*actual, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(db.statements().is_empty(), "nothing may run after a config error");
    assert_eq!(db.commits(), 0);
}

#[test]
fn merge_failure_leaves_the_transaction_uncommitted() {
    let mut db = MockDatabase::new();
    db.fail_on("INSERT INTO");
    let mut p = picker("a\n1\n", &["a"]);

    let err = bulk_load(&mut db, &mut p, "t", &dest(&["a"]), "DO NOTHING");
    assert!(err.is_err());
    assert_eq!(db.commits(), 0);
}
