use chrono::{Datelike, NaiveDate};
use granary::db::{Row, SqlValue};
use granary::partition::{covering_bounds, ensure_partition, partition_name};
use granary::testing::MockDatabase;
use granary::IngestError;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn bounds_cover_the_date_and_align_to_the_epoch() {
    let date = day(2024, 5, 12);
    for range in [1u32, 7, 30] {
        let b = covering_bounds(date, range);
        assert!(b.lower <= date && date < b.upper, "range {range}");
        assert_eq!((b.upper - b.lower).num_days(), i64::from(range));
        assert_eq!(b.lower.num_days_from_ce() % i32::try_from(range).unwrap(), 0);
    }
}

#[test]
fn one_day_range_pins_the_partition_to_the_date() {
    let b = covering_bounds(day(2019, 6, 12), 1);
    assert_eq!(b.lower, day(2019, 6, 12));
    assert_eq!(b.upper, day(2019, 6, 13));
}

#[test]
fn same_interval_means_same_name() {
    let range = 7;
    let a = covering_bounds(day(2024, 5, 12), range);
    let b = covering_bounds(a.lower, range);
    assert_eq!(a, b);
    assert_eq!(
        partition_name("sp_stats", a.lower),
        partition_name("sp_stats", b.lower)
    );
}

#[test]
fn name_encodes_table_and_lower_bound() {
    assert_eq!(
        partition_name("sp_stats", day(2024, 5, 12)),
        "sp_stats_p20240512"
    );
}

#[test]
fn empty_lookup_always_creates() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    // No scripted response: the lookup comes back with no rows.
    let name = ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;
    assert_eq!(name, "sp_stats_p20240512");

    let ddl: Vec<_> = db
        .statements()
        .iter()
        .filter(|s| s.starts_with("CREATE TABLE IF NOT EXISTS"))
        .collect();
    assert_eq!(ddl.len(), 1);
    assert_eq!(
        ddl[0],
        "CREATE TABLE IF NOT EXISTS sp_stats_p20240512 PARTITION OF sp_stats \
         FOR VALUES FROM ('2024-05-12') TO ('2024-05-13')"
    );
    Ok(())
}

#[test]
fn null_bound_also_creates() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    // max() over a fresh table: one row, NULL value.
    db.respond_with(vec![Row::new(
        vec!["created_at".into()],
        vec![SqlValue::Null],
    )]);
    ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;
    assert!(
        db.statements()
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS sp_stats_p20240512"))
    );
    Ok(())
}

#[test]
fn covered_interval_returns_existing_name_without_ddl() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    db.respond_with(vec![Row::new(
        vec!["created_at".into()],
        vec![SqlValue::Null],
    )]);
    let first = ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;

    // Second call: the bound now reflects the loaded data.
    db.respond_with(vec![Row::new(
        vec!["created_at".into()],
        vec![SqlValue::Date(day(2024, 5, 12))],
    )]);
    let second = ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;

    assert_eq!(first, second);
    let creates = db
        .statements()
        .iter()
        .filter(|s| s.starts_with("CREATE TABLE IF NOT EXISTS"))
        .count();
    assert_eq!(creates, 1, "no DDL may be re-issued for a covered interval");
    Ok(())
}

#[test]
fn timestamp_bounds_cover_via_their_date_part() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    db.respond_with(vec![Row::new(
        vec!["created_at".into()],
        vec![SqlValue::Timestamp(
            day(2024, 5, 12).and_hms_opt(13, 45, 0).expect("valid time"),
        )],
    )]);
    ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;
    assert!(
        !db.statements()
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS"))
    );
    Ok(())
}

#[test]
fn lookup_row_without_the_column_is_state_unknown() {
    let mut db = MockDatabase::new();
    // A row that carries some other field but not the partition key.
    db.respond_with(vec![Row::new(
        vec!["something_else".into()],
        vec![SqlValue::Int(1)],
    )]);
    let err = ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)
        .err()
        .expect("state must be unknown");
    match err.downcast_ref::<IngestError>() {
        Some(IngestError::PartitionStateUnknown { table, column }) => {
            assert_eq!(table, "sp_stats");
            assert_eq!(column, "created_at");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // And crucially: no partition was created on a guess.
    assert!(
        !db.statements()
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS"))
    );
}

#[test]
fn stale_bound_creates_the_next_partition() -> anyhow::Result<()> {
    let mut db = MockDatabase::new();
    db.respond_with(vec![Row::new(
        vec!["created_at".into()],
        vec![SqlValue::Date(day(2024, 5, 10))],
    )]);
    let name = ensure_partition(&mut db, "sp_stats", day(2024, 5, 12), "created_at", 1)?;
    assert_eq!(name, "sp_stats_p20240512");
    assert!(
        db.statements()
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS sp_stats_p20240512"))
    );
    Ok(())
}
