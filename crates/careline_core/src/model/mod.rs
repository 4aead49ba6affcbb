//! Domain model for accounts, doctors, studios and profiles.
//!
//! # Responsibility
//! - Define typed records for every persisted entity kind.
//! - Enumerate, per kind, the fields callers may set at creation and update.
//! - Define the serialization policy (audit columns are never serialized).
//!
//! # Invariants
//! - Every record is identified by an `EntityId` drawn from the sequence
//!   named after its table, never by auto-increment.
//! - Deletion of soft-deleting kinds is a `deleted_at` tombstone.

pub mod doctor;
pub mod entity;
pub mod field;
pub mod studio;
pub mod user;
pub mod user_info;
