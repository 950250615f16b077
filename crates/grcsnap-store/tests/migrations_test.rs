//! Migration runner against on-disk databases

use grcsnap_core::errors::ExErrorKind;
use grcsnap_store::db;
use grcsnap_store::migrations::{apply_migrations, current_schema_version, get_migrations};
use tempfile::TempDir;

#[test]
fn test_migrations_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("store.db");

    {
        let mut conn = db::open(&path).unwrap();
        apply_migrations(&mut conn).unwrap();
    }

    let mut conn = db::open(&path).unwrap();
    apply_migrations(&mut conn).unwrap();
    let latest = get_migrations().last().map(|m| m.id.to_string());
    assert_eq!(current_schema_version(&conn).unwrap(), latest);
}

#[test]
fn test_checksum_mismatch_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    let mut conn = db::open(&path).unwrap();
    apply_migrations(&mut conn).unwrap();

    conn.execute(
        "UPDATE schema_version SET checksum = 'tampered' WHERE migration_id = '003_snapshots'",
        [],
    )
    .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
}

#[test]
fn test_foreign_keys_enabled_on_open() {
    let temp_dir = TempDir::new().unwrap();
    let conn = db::open(temp_dir.path().join("store.db")).unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}
