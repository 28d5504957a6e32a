use bujo_core::db::migrations::{apply_migrations, latest_version};
use bujo_core::db::{open_db_in_memory, DbError};

#[test]
fn migrations_create_expected_tables() {
    let conn = open_db_in_memory().unwrap();

    for table in [
        "collections",
        "collection_members",
        "items",
        "collection_forests",
        "completed_items",
    ] {
        let exists: i64 = conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
                );",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1, "table `{table}` should exist");
    }
}

#[test]
fn user_version_tracks_latest_migration() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(latest_version() >= 2);
}

#[test]
fn reapplying_migrations_is_a_noop() {
    let mut conn = open_db_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn newer_schema_version_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("PRAGMA user_version = 99;").unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::UnsupportedSchemaVersion { db_version: 99, .. }
    ));
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO items (item_uuid, collection_uuid, type, name, owner)
         VALUES ('i-1', 'missing-collection', 'task', 'x', 'alice');",
        [],
    );
    assert!(result.is_err());
}
