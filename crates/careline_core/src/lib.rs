//! Persistence core for the Careline platform.
//! Owns account entities, sequenced id allocation and change notification.

pub mod config;
pub mod db;
pub mod event;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::sequence::{SequenceAllocator, SequenceError, SqliteSequenceAllocator};
pub use db::{open_db, open_db_in_memory, DbError};
pub use event::change::{ChangeEvent, ChangeOp};
pub use event::dispatcher::{
    ChannelDispatcher, EventDispatcher, NoopDispatcher, RecordingDispatcher,
};
pub use event::notifier::{FieldNotifier, NoopNotifier, Notifier};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogSink};
pub use model::entity::{Entity, EntityId, ValidationError};
pub use model::user::{NewUser, User, UserPatch, UserRole, UserStatus};
pub use repo::entity_store::{EntityStore, ListQuery, RepoError, RepoResult, SqliteEntityStore};
pub use service::user_service::{ServiceError, SqliteUserService, UserService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
