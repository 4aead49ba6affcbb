//! Row mapping between entity structs and their SQLite tables.
//!
//! # Invariants
//! - `COLUMNS` lists every non-key, non-audit column in bind order and must
//!   match the column names patches emit.
//! - Read paths reject unknown enum codes instead of masking them.

use crate::model::doctor::Doctor;
use crate::model::entity::{AuditStamps, Entity};
use crate::model::studio::DoctorStudio;
use crate::model::user::{User, UserRole, UserStatus};
use crate::model::user_info::{InfoUserType, UserInfo};
use crate::repo::entity_store::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;

pub(crate) const AUDIT_COLUMNS: [&str; 3] = ["created_at", "updated_at", "deleted_at"];

/// Entity kinds the SQLite stores know how to bind and decode.
pub trait Record: Entity {
    const COLUMNS: &'static [&'static str];

    /// Column values in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

/// `SELECT id, <columns>, <audit columns> FROM <table>` for one kind.
pub(crate) fn select_sql<E: Record>() -> String {
    let mut columns = vec!["id"];
    columns.extend_from_slice(E::COLUMNS);
    columns.extend_from_slice(&AUDIT_COLUMNS);
    format!("SELECT {} FROM {}", columns.join(", "), E::TABLE)
}

fn read_audit(row: &Row<'_>) -> RepoResult<AuditStamps> {
    Ok(AuditStamps {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn decode<T>(
    table: &str,
    column: &str,
    code: i64,
    parse: impl FnOnce(i64) -> Option<T>,
) -> RepoResult<T> {
    parse(code).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid code `{code}` in {table}.{column}"))
    })
}

impl Record for User {
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "username",
        "mobile",
        "email",
        "icon_url",
        "openid",
        "password_hash",
        "api_token",
        "sms_code",
        "role",
        "status",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            text(&self.username),
            text(&self.mobile),
            text(&self.email),
            text(&self.icon_url),
            text(&self.openid),
            text(&self.password_hash),
            text(&self.api_token),
            text(&self.sms_code),
            Value::Integer(self.role.code()),
            Value::Integer(self.status.code()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            mobile: row.get("mobile")?,
            name: row.get("name")?,
            username: row.get("username")?,
            icon_url: row.get("icon_url")?,
            email: row.get("email")?,
            openid: row.get("openid")?,
            password_hash: row.get("password_hash")?,
            api_token: row.get("api_token")?,
            sms_code: row.get("sms_code")?,
            role: decode("users", "role", row.get("role")?, UserRole::from_code)?,
            status: decode("users", "status", row.get("status")?, UserStatus::from_code)?,
            audit: read_audit(row)?,
        })
    }
}

impl Record for Doctor {
    const COLUMNS: &'static [&'static str] = &["user_id", "name"];

    fn values(&self) -> Vec<Value> {
        vec![Value::Integer(self.user_id), Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            audit: read_audit(row)?,
        })
    }
}

impl Record for DoctorStudio {
    const COLUMNS: &'static [&'static str] = &["name", "owner_id", "description"];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            self.owner_id.map_or(Value::Null, Value::Integer),
            text(&self.description),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            owner_id: row.get("owner_id")?,
            description: row.get("description")?,
            audit: read_audit(row)?,
        })
    }
}

impl Record for UserInfo {
    const COLUMNS: &'static [&'static str] =
        &["user_id", "name", "user_type", "role", "department"];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.user_id),
            Value::Text(self.name.clone()),
            Value::Integer(self.user_type.code()),
            text(&self.role),
            text(&self.department),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            user_type: decode(
                "user_infos",
                "user_type",
                row.get("user_type")?,
                InfoUserType::from_code,
            )?,
            role: row.get("role")?,
            department: row.get("department")?,
            audit: read_audit(row)?,
        })
    }
}
