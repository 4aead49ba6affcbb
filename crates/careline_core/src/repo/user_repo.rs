//! Account lookups that go beyond find-by-id.
//!
//! # Responsibility
//! - Verify that an id names a live, normal-status user, optionally of a
//!   given role.
//! - Resolve accounts by login name and check for profile rows.
//!
//! # Invariants
//! - Tombstoned users never match.
//! - Disabled and inactivated users never verify.

use crate::model::doctor::Doctor;
use crate::model::entity::{Entity, EntityId};
use crate::model::user::{User, UserRole, UserStatus};
use crate::model::user_info::UserInfo;
use crate::repo::entity_store::{ensure_connection_ready, RepoResult};
use crate::repo::records::{select_sql, Record};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

/// Read-side queries over `users`.
pub trait UserRepository {
    /// Finds a live user with normal status, restricted to `role` when given.
    fn find_active(&self, id: EntityId, role: Option<UserRole>) -> RepoResult<Option<User>>;
    /// Finds a live user by login name.
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Whether a live profile row exists for `user_id`.
    fn has_user_info(&self, user_id: EntityId) -> RepoResult<bool>;
    /// Doctor row owned by `user_id`, if any.
    fn find_doctor_by_user(&self, user_id: EntityId) -> RepoResult<Option<Doctor>>;
}

/// SQLite-backed user queries.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, User::TABLE)?;
        ensure_connection_ready(conn, UserInfo::TABLE)?;
        ensure_connection_ready(conn, Doctor::TABLE)?;
        Ok(Self { conn })
    }

    fn query_one<R: Record>(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Option<R>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        if let Some(row) = rows.next()? {
            return Ok(Some(R::from_row(row)?));
        }
        Ok(None)
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_active(&self, id: EntityId, role: Option<UserRole>) -> RepoResult<Option<User>> {
        let mut sql = format!(
            "{} WHERE id = ? AND status = ? AND deleted_at IS NULL",
            select_sql::<User>()
        );
        let mut bind_values = vec![
            Value::Integer(id),
            Value::Integer(UserStatus::Normal.code()),
        ];
        if let Some(role) = role {
            sql.push_str(" AND role = ?");
            bind_values.push(Value::Integer(role.code()));
        }
        self.query_one(&sql, bind_values)
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.query_one(
            &format!(
                "{} WHERE username = ? AND deleted_at IS NULL",
                select_sql::<User>()
            ),
            vec![Value::Text(username.to_string())],
        )
    }

    fn has_user_info(&self, user_id: EntityId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM user_infos
                WHERE user_id = ?1
                  AND deleted_at IS NULL
            );",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_doctor_by_user(&self, user_id: EntityId) -> RepoResult<Option<Doctor>> {
        self.query_one(
            &format!(
                "{} WHERE user_id = ? AND deleted_at IS NULL ORDER BY id ASC LIMIT 1",
                select_sql::<Doctor>()
            ),
            vec![Value::Integer(user_id)],
        )
    }
}
