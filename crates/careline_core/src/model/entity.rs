//! Entity contract shared by every persisted kind.
//!
//! # Responsibility
//! - Describe table, kind label and soft-delete policy per entity kind.
//! - Connect each kind to its typed creation input and update patch.
//! - Connect each kind to the notifier that decides which writes are notable.
//!
//! # Invariants
//! - `id` is assigned exactly once, from the sequence named `TABLE`.
//! - `AuditStamps` are owned by the write path and never serialized.

use crate::event::notifier::Notifier;
use crate::model::field::{changed_fields, ChangedFields, FieldChange};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Externally sequenced primary key.
pub type EntityId = i64;

/// Audit timestamps in unix epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStamps {
    pub created_at: i64,
    pub updated_at: i64,
    /// Soft-delete tombstone. `None` for live rows.
    pub deleted_at: Option<i64>,
}

impl AuditStamps {
    /// Stamps a record created at `now_ms`.
    pub fn created(now_ms: i64) -> Self {
        Self {
            created_at: now_ms,
            updated_at: now_ms,
            deleted_at: None,
        }
    }
}

/// Field-level validation failure for entity writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid `{}`: {}", self.field, self.message)
    }
}

impl Error for ValidationError {}

/// Typed partial update for one entity kind.
///
/// Only the fields a patch type declares can ever be written through it.
pub trait EntityPatch {
    /// Column assignments in declaration order; unset fields are omitted.
    fn changes(&self) -> Vec<FieldChange>;

    fn is_empty(&self) -> bool {
        self.changes().is_empty()
    }

    fn changed_fields(&self) -> ChangedFields {
        changed_fields(&self.changes())
    }
}

/// A persisted record kind.
pub trait Entity: Clone + Sized {
    /// Backing table, also the name of the id sequence.
    const TABLE: &'static str;
    /// Human-facing kind label used in logs.
    const KIND: &'static str;
    /// Whether `delete` writes a tombstone instead of removing the row.
    const SOFT_DELETE: bool;

    /// Fields accepted at creation.
    type New;
    /// Fields accepted at update.
    type Patch: EntityPatch;

    /// Builds an in-memory record with a placeholder id of `0`.
    fn from_new(new: Self::New, now_ms: i64) -> Self;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    fn audit(&self) -> &AuditStamps;

    fn audit_mut(&mut self) -> &mut AuditStamps;

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Notability rule and index label for this kind.
    fn notifier() -> &'static dyn Notifier;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn is_deleted(&self) -> bool {
        self.audit().deleted_at.is_some()
    }
}

/// Serializes a record with its hidden-field policy applied.
///
/// Non-ASCII text is written verbatim, never `\u` escaped.
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// Current wall clock in unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

pub(crate) fn require_non_blank(
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}
