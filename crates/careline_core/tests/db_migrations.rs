use careline_core::db::migrations::{current_user_version, latest_version};
use careline_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const ENTITY_TABLES: [&str; 4] = ["users", "doctors", "doctor_studios", "user_infos"];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "sequences");
    for table in ENTITY_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn every_entity_table_has_a_sequence_starting_at_zero() {
    let conn = open_db_in_memory().unwrap();

    for table in ENTITY_TABLES {
        let value: i64 = conn
            .query_row(
                "SELECT value FROM sequences WHERE name = ?1;",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, 0, "sequence {table} should start at zero");
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("careline.db");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute("UPDATE sequences SET value = 7 WHERE name = 'users';", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(current_user_version(&conn_second).unwrap(), latest_version());
    let value: i64 = conn_second
        .query_row(
            "SELECT value FROM sequences WHERE name = 'users';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(value, 7, "reopening must not reseed sequences");
}

#[test]
fn file_databases_use_wal_and_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.db")).unwrap();

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
    assert_eq!(foreign_keys, 1);
}

#[test]
fn users_status_only_admits_known_codes() {
    let conn = open_db_in_memory().unwrap();

    for (id, status) in [(1, 0), (2, 1), (3, 2)] {
        insert_user(&conn, id, status).unwrap();
    }
    for (id, status) in [(4, 4), (5, 16)] {
        let err = insert_user(&conn, id, status).unwrap_err();
        assert_eq!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation),
            "status {status} must be rejected"
        );
    }
}

#[test]
fn tombstoned_profile_does_not_block_a_new_one() {
    let conn = open_db_in_memory().unwrap();
    insert_user(&conn, 1, 0).unwrap();

    let insert_profile = |id: i64, deleted_at: Option<i64>| {
        conn.execute(
            "INSERT INTO user_infos (id, user_id, name, user_type, created_at, updated_at, deleted_at)
             VALUES (?1, 1, 'profile', 1, 0, 0, ?2);",
            rusqlite::params![id, deleted_at],
        )
    };

    insert_profile(1, Some(10)).unwrap();
    insert_profile(2, None).unwrap();
    let err = insert_profile(3, None).unwrap_err();
    assert_eq!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    );
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn insert_user(conn: &Connection, id: i64, status: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO users (id, username, role, status, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, 0, 0);",
        rusqlite::params![id, format!("user_{id}"), status],
    )
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
