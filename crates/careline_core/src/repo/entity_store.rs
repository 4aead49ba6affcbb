//! Generic entity store: sequenced inserts and notifying writes.
//!
//! # Responsibility
//! - Create records with ids drawn from the sequence named after the table.
//! - Run updates and deletes through the entity's notifier and publish the
//!   resulting change events.
//! - Keep soft-deleted rows out of reads unless explicitly requested.
//!
//! # Invariants
//! - Sequence draw and insert are separate statements; a failed insert leaves
//!   a permanent gap in the id space.
//! - Notability is decided before the write; the event is published only
//!   after the write affected a row. A failed write publishes nothing.
//! - Publishing never turns a successful write into an error.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::sequence::{SequenceAllocator, SequenceError, SqliteSequenceAllocator};
use crate::db::DbError;
use crate::event::change::{ChangeEvent, ChangeOp};
use crate::event::dispatcher::EventDispatcher;
use crate::model::entity::{now_epoch_ms, Entity, EntityId, EntityPatch, ValidationError};
use crate::model::field::{changed_fields, ChangedFields, FieldValue};
use crate::repo::records::{select_sql, Record, AUDIT_COLUMNS};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Identifier allocation failed; fatal for the create call.
    Sequence(SequenceError),
    NotFound {
        table: &'static str,
        id: EntityId,
    },
    InvalidData(String),
    /// The operation is not defined for this entity kind.
    Unsupported(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Sequence(err) => write!(f, "id allocation failed: {err}"),
            Self::NotFound { table, id } => write!(f, "{table} row not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unsupported(message) => write!(f, "unsupported operation: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Sequence(err) => Some(err),
            Self::NotFound { .. }
            | Self::InvalidData(_)
            | Self::Unsupported(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SequenceError> for RepoError {
    fn from(value: SequenceError) -> Self {
        Self::Sequence(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Listing options. Soft-deleted rows are only returned when asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Persistence contract for one entity kind.
pub trait EntityStore<E: Entity> {
    /// Allocates an id from the table's sequence, then inserts.
    ///
    /// Returns `Ok(None)` when the insert is rejected; the drawn id is not
    /// reclaimed. Allocation failures are returned as `Err`.
    fn create_with_auto_id(&self, new: E::New) -> RepoResult<Option<E>>;

    fn find(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<E>>;

    /// Lists records ordered by id.
    fn list(&self, query: &ListQuery) -> RepoResult<Vec<E>>;

    /// Applies `patch` to a live record and publishes when notable.
    fn update(&self, entity: &mut E, patch: &E::Patch) -> RepoResult<()>;

    /// Deletes (or tombstones) a live record and publishes when indexed.
    fn delete(&self, entity: &mut E) -> RepoResult<()>;

    /// Clears a soft-delete tombstone.
    fn restore(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed entity store.
pub struct SqliteEntityStore<'conn, E> {
    conn: &'conn Connection,
    sequences: Box<dyn SequenceAllocator + 'conn>,
    dispatcher: Arc<dyn EventDispatcher>,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Record> SqliteEntityStore<'conn, E> {
    /// Constructs a store over a migrated write connection.
    ///
    /// Ids are drawn through the same connection.
    pub fn try_new(
        conn: &'conn Connection,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> RepoResult<Self> {
        ensure_connection_ready(conn, E::TABLE)?;
        Ok(Self {
            conn,
            sequences: Box::new(SqliteSequenceAllocator::new(conn)),
            dispatcher,
            _entity: PhantomData,
        })
    }

    /// Replaces the id source.
    pub fn with_sequences(mut self, sequences: impl SequenceAllocator + 'conn) -> Self {
        self.sequences = Box::new(sequences);
        self
    }

    /// Hands a pre-built event to the dispatcher once the write is confirmed.
    fn dispatch(&self, id: EntityId, op: ChangeOp, event: Option<ChangeEvent>) {
        match event {
            Some(event) => {
                self.dispatcher.publish(event);
                info!(
                    "event=change_notify module=repo status=published kind={} id={} op={}",
                    E::KIND,
                    id,
                    op.as_str()
                );
            }
            None => debug!(
                "event=change_notify module=repo status=skipped kind={} id={} op={}",
                E::KIND,
                id,
                op.as_str()
            ),
        }
    }

    fn insert(&self, entity: &E) -> RepoResult<()> {
        let audit = entity.audit();
        let mut columns = vec!["id"];
        columns.extend_from_slice(E::COLUMNS);
        columns.extend_from_slice(&AUDIT_COLUMNS);
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values = vec![Value::Integer(entity.id())];
        values.extend(entity.values());
        values.push(Value::Integer(audit.created_at));
        values.push(Value::Integer(audit.updated_at));
        values.push(audit.deleted_at.map_or(Value::Null, Value::Integer));

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                E::TABLE,
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;
        Ok(())
    }
}

impl<E: Record> EntityStore<E> for SqliteEntityStore<'_, E> {
    fn create_with_auto_id(&self, new: E::New) -> RepoResult<Option<E>> {
        let mut entity = E::from_new(new, now_epoch_ms());
        entity.validate()?;

        let id = self.sequences.next_value(E::TABLE)?;
        entity.set_id(id);

        match self.insert(&entity) {
            Ok(()) => {
                info!(
                    "event=entity_create module=repo status=ok kind={} id={}",
                    E::KIND,
                    id
                );
                Ok(Some(entity))
            }
            Err(RepoError::Db(err)) => {
                let error_code = if err.is_constraint_violation() {
                    "insert_rejected"
                } else {
                    "insert_failed"
                };
                warn!(
                    "event=entity_create module=repo status=error kind={} id={} error_code={} error={}",
                    E::KIND,
                    id,
                    error_code,
                    err
                );
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn find(&self, id: EntityId, include_deleted: bool) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "{}
             WHERE id = ?1
               AND (?2 = 1 OR deleted_at IS NULL);",
            select_sql::<E>()
        ))?;

        let mut rows = stmt.query(params![id, include_deleted])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }

        Ok(None)
    }

    fn list(&self, query: &ListQuery) -> RepoResult<Vec<E>> {
        let mut sql = format!("{} WHERE 1 = 1", select_sql::<E>());
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        sql.push_str(" ORDER BY id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }

        Ok(entities)
    }

    fn update(&self, entity: &mut E, patch: &E::Patch) -> RepoResult<()> {
        let changes = patch.changes();
        if changes.is_empty() {
            return Ok(());
        }

        let changed = changed_fields(&changes);
        let event = E::notifier().on_mutate(entity.id(), ChangeOp::Update, &changed);
        let mut updated = entity.clone();
        updated.apply_patch(patch);
        updated.validate()?;

        let now_ms = now_epoch_ms();
        let assignments = changes
            .iter()
            .enumerate()
            .map(|(index, change)| format!("{} = ?{}", change.column, index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut values: Vec<Value> = changes
            .into_iter()
            .map(|change| sql_value(change.value))
            .collect();
        let updated_at_index = values.len() + 1;
        values.push(Value::Integer(now_ms));
        values.push(Value::Integer(entity.id()));

        let affected = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET {assignments}, updated_at = ?{updated_at_index}
                 WHERE id = ?{}
                   AND deleted_at IS NULL;",
                E::TABLE,
                updated_at_index + 1
            ),
            params_from_iter(values),
        )?;
        if affected == 0 {
            return Err(RepoError::NotFound {
                table: E::TABLE,
                id: entity.id(),
            });
        }

        updated.audit_mut().updated_at = now_ms;
        *entity = updated;
        self.dispatch(entity.id(), ChangeOp::Update, event);
        Ok(())
    }

    fn delete(&self, entity: &mut E) -> RepoResult<()> {
        let id = entity.id();
        let event = E::notifier().on_mutate(id, ChangeOp::Delete, &ChangedFields::new());
        let now_ms = now_epoch_ms();
        let affected = if E::SOFT_DELETE {
            self.conn.execute(
                &format!(
                    "UPDATE {}
                     SET deleted_at = ?1, updated_at = ?1
                     WHERE id = ?2
                       AND deleted_at IS NULL;",
                    E::TABLE
                ),
                params![now_ms, id],
            )?
        } else {
            self.conn
                .execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?
        };
        if affected == 0 {
            return Err(RepoError::NotFound {
                table: E::TABLE,
                id,
            });
        }

        let audit = entity.audit_mut();
        audit.deleted_at = Some(now_ms);
        audit.updated_at = now_ms;
        self.dispatch(id, ChangeOp::Delete, event);
        Ok(())
    }

    fn restore(&self, id: EntityId) -> RepoResult<()> {
        if !E::SOFT_DELETE {
            return Err(RepoError::Unsupported(format!(
                "{} rows are hard-deleted and cannot be restored",
                E::KIND
            )));
        }

        let affected = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET deleted_at = NULL, updated_at = ?1
                 WHERE id = ?2
                   AND deleted_at IS NOT NULL;",
                E::TABLE
            ),
            params![now_epoch_ms(), id],
        )?;
        if affected == 0 {
            return Err(RepoError::NotFound {
                table: E::TABLE,
                id,
            });
        }

        Ok(())
    }
}

fn sql_value(value: FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(value) => Value::Integer(value),
        FieldValue::Text(value) => Value::Text(value),
    }
}

pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable(table));
    }

    Ok(())
}

