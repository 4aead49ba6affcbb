//! Named database sequences used as primary-key sources.
//!
//! # Responsibility
//! - Draw the next value of a named counter stored in `sequences`.
//! - Register new counters for tables added after the initial schema.
//!
//! # Invariants
//! - Values are unique and strictly increasing per sequence name.
//! - The increment and the read-back run inside one `BEGIN IMMEDIATE`
//!   transaction, so concurrent connections serialize on the SQLite write
//!   lock instead of on application state.
//! - Drawn values are never handed back, even when the caller's insert fails.

use crate::db::DbError;
use log::error;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SequenceResult<T> = Result<T, SequenceError>;

/// Failure to draw from or register a sequence.
///
/// Allocation errors are fatal for the calling write path; nothing at this
/// layer retries.
#[derive(Debug)]
pub enum SequenceError {
    /// No counter with this name exists.
    NotFound(String),
    /// A counter with this name is already registered.
    AlreadyExists(String),
    Db(DbError),
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "sequence not found: {name}"),
            Self::AlreadyExists(name) => write!(f, "sequence already exists: {name}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SequenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyExists(_) => None,
        }
    }
}

impl From<DbError> for SequenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SequenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Source of externally sequenced identifiers.
pub trait SequenceAllocator {
    /// Consumes and returns the next value of sequence `name`.
    fn next_value(&self, name: &str) -> SequenceResult<i64>;
}

/// Sequence allocator bound to the write-capable connection.
pub struct SqliteSequenceAllocator<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSequenceAllocator<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers sequence `name` so that its first drawn value is `start + 1`.
    pub fn create_sequence(&self, name: &str, start: i64) -> SequenceResult<()> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sequences (name, value) VALUES (?1, ?2);",
            params![name, start],
        )?;
        if inserted == 0 {
            return Err(SequenceError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }

    /// Returns the last value handed out by `name` without consuming one.
    pub fn current_value(&self, name: &str) -> SequenceResult<i64> {
        read_value(self.conn, name)?.ok_or_else(|| SequenceError::NotFound(name.to_string()))
    }
}

impl SequenceAllocator for SqliteSequenceAllocator<'_> {
    fn next_value(&self, name: &str) -> SequenceResult<i64> {
        let result = draw_next(self.conn, name);
        if let Err(err) = &result {
            error!(
                "event=sequence_next module=db status=error sequence={} error={}",
                name, err
            );
        }
        result
    }
}

fn draw_next(conn: &Connection, name: &str) -> SequenceResult<i64> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let changed = tx.execute(
        "UPDATE sequences SET value = value + 1 WHERE name = ?1;",
        [name],
    )?;
    if changed == 0 {
        return Err(SequenceError::NotFound(name.to_string()));
    }
    let value =
        read_value(&tx, name)?.ok_or_else(|| SequenceError::NotFound(name.to_string()))?;
    tx.commit()?;
    Ok(value)
}

fn read_value(conn: &Connection, name: &str) -> SequenceResult<Option<i64>> {
    let value = conn
        .query_row(
            "SELECT value FROM sequences WHERE name = ?1;",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{SequenceAllocator, SequenceError, SqliteSequenceAllocator};
    use crate::db::open_db_in_memory;

    #[test]
    fn next_value_is_strictly_increasing() {
        let conn = open_db_in_memory().unwrap();
        let sequences = SqliteSequenceAllocator::new(&conn);

        let first = sequences.next_value("users").unwrap();
        let second = sequences.next_value("users").unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(sequences.current_value("users").unwrap(), 2);
    }

    #[test]
    fn sequences_are_independent_per_name() {
        let conn = open_db_in_memory().unwrap();
        let sequences = SqliteSequenceAllocator::new(&conn);

        sequences.next_value("users").unwrap();
        sequences.next_value("users").unwrap();
        assert_eq!(sequences.next_value("doctors").unwrap(), 1);
    }

    #[test]
    fn unknown_sequence_is_an_error() {
        let conn = open_db_in_memory().unwrap();
        let sequences = SqliteSequenceAllocator::new(&conn);

        let err = sequences.next_value("nope").unwrap_err();
        assert!(matches!(err, SequenceError::NotFound(name) if name == "nope"));
    }

    #[test]
    fn create_sequence_honors_start_and_rejects_duplicates() {
        let conn = open_db_in_memory().unwrap();
        let sequences = SqliteSequenceAllocator::new(&conn);

        sequences.create_sequence("referrals", 1000).unwrap();
        assert_eq!(sequences.next_value("referrals").unwrap(), 1001);

        let err = sequences.create_sequence("referrals", 0).unwrap_err();
        assert!(matches!(err, SequenceError::AlreadyExists(_)));
    }
}
