//! User account use-case service.
//!
//! # Responsibility
//! - Verify accounts by id, status and role.
//! - Onboard WeChat, password, staff and doctor accounts with sequenced ids.
//! - Route profile edits and removals through the notifying store.
//!
//! # Invariants
//! - Service APIs never bypass repository validation or notification.
//! - A rejected insert surfaces as `Ok(None)`, never as a panic or partial
//!   success report.

use crate::event::dispatcher::EventDispatcher;
use crate::model::doctor::{Doctor, NewDoctor};
use crate::model::entity::{now_epoch_ms, Entity, EntityId};
use crate::model::user::{NewUser, User, UserPatch, UserRole};
use crate::model::user_info::{InfoUserType, NewUserInfo, UserInfo};
use crate::repo::entity_store::{EntityStore, RepoError, RepoResult, SqliteEntityStore};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use log::warn;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Service error for account use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Caller input rejected before touching storage.
    InvalidInput(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Account facade over the user query repository and the entity stores.
pub struct UserService<Q, U, D, I> {
    queries: Q,
    users: U,
    doctors: D,
    infos: I,
}

/// [`UserService`] wired to one SQLite write connection.
pub type SqliteUserService<'conn> = UserService<
    SqliteUserRepository<'conn>,
    SqliteEntityStore<'conn, User>,
    SqliteEntityStore<'conn, Doctor>,
    SqliteEntityStore<'conn, UserInfo>,
>;

impl<'conn> SqliteUserService<'conn> {
    /// Builds the service over a migrated connection, publishing to
    /// `dispatcher`.
    pub fn try_from_connection(
        conn: &'conn Connection,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteUserRepository::try_new(conn)?,
            SqliteEntityStore::try_new(conn, Arc::clone(&dispatcher))?,
            SqliteEntityStore::try_new(conn, Arc::clone(&dispatcher))?,
            SqliteEntityStore::try_new(conn, dispatcher)?,
        ))
    }
}

impl<Q, U, D, I> UserService<Q, U, D, I>
where
    Q: UserRepository,
    U: EntityStore<User>,
    D: EntityStore<Doctor>,
    I: EntityStore<UserInfo>,
{
    pub fn new(queries: Q, users: U, doctors: D, infos: I) -> Self {
        Self {
            queries,
            users,
            doctors,
            infos,
        }
    }

    /// Live user with normal status.
    pub fn verify_user(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.queries.find_active(id, None)
    }

    /// Live, normal-status user holding `role`.
    pub fn verify_role(&self, id: EntityId, role: UserRole) -> RepoResult<Option<User>> {
        self.queries.find_active(id, Some(role))
    }

    pub fn verify_doctor(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.verify_role(id, UserRole::Doctor)
    }

    pub fn verify_patient(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.verify_role(id, UserRole::Normal)
    }

    pub fn verify_ma(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.verify_role(id, UserRole::Ma)
    }

    pub fn verify_pa(&self, id: EntityId) -> RepoResult<Option<User>> {
        self.verify_role(id, UserRole::Pa)
    }

    /// Live user by login name, regardless of status.
    pub fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.queries.find_by_username(username.trim())
    }

    /// A patient counts as purchased once a profile row exists for them.
    pub fn is_purchased_user(&self, id: EntityId) -> RepoResult<bool> {
        if self.verify_patient(id)?.is_none() {
            return Ok(false);
        }
        self.queries.has_user_info(id)
    }

    /// Creates a patient account from a WeChat login.
    pub fn create_wechat_user(
        &self,
        openid: &str,
        nickname: &str,
        icon_url: &str,
    ) -> ServiceResult<Option<User>> {
        let openid = openid.trim();
        if openid.is_empty() {
            return Err(ServiceError::InvalidInput(
                "openid must not be empty".to_string(),
            ));
        }

        let mut new = NewUser::new(UserRole::Normal);
        new.openid = Some(openid.to_string());
        new.name = nickname.to_string();
        new.icon_url = Some(icon_url.to_string());
        Ok(self.users.create_with_auto_id(new)?)
    }

    /// Creates a password account with a fresh api token.
    ///
    /// `password_hash` must already be hashed by the caller.
    pub fn create_by_username(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
        name: &str,
    ) -> ServiceResult<Option<User>> {
        if password_hash.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "password hash must not be empty".to_string(),
            ));
        }

        let mut new = NewUser::new(role);
        new.username = Some(username.trim().to_string());
        new.name = name.to_string();
        new.password_hash = Some(password_hash.to_string());
        new.api_token = Some(generate_api_token());
        Ok(self.users.create_with_auto_id(new)?)
    }

    /// Creates a staff account (MA, PA or company staff) and its profile.
    ///
    /// Returns `Ok(None)` for non-staff roles or a rejected account insert.
    pub fn create_staff_user(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
        name: &str,
    ) -> ServiceResult<Option<User>> {
        if !role.is_staff() {
            return Ok(None);
        }

        let Some(user) = self.create_by_username(username, password_hash, role, name)? else {
            return Ok(None);
        };

        let info = self.infos.create_with_auto_id(NewUserInfo {
            user_id: user.id,
            name: username.trim().to_string(),
            user_type: InfoUserType::Staff,
            role: Some(role.label().to_string()),
            department: role.department().map(str::to_string),
        })?;
        if info.is_none() {
            warn!(
                "event=staff_onboard module=service status=error user_id={} error_code=profile_rejected",
                user.id
            );
        }

        Ok(Some(user))
    }

    /// Creates a doctor-role account, and its `Doctor` row when asked to.
    ///
    /// Doctor-row validation runs before the account is inserted, so invalid
    /// input leaves no account behind.
    pub fn create_doctor_user(
        &self,
        username: &str,
        password_hash: &str,
        name: &str,
        create_doctor: bool,
    ) -> ServiceResult<Option<User>> {
        let new_doctor = NewDoctor {
            user_id: 0,
            name: name.to_string(),
        };
        if create_doctor {
            Doctor::from_new(new_doctor.clone(), now_epoch_ms())
                .validate()
                .map_err(RepoError::from)?;
        }

        let Some(user) =
            self.create_by_username(username, password_hash, UserRole::Doctor, name)?
        else {
            return Ok(None);
        };

        if create_doctor {
            let doctor = self.doctors.create_with_auto_id(NewDoctor {
                user_id: user.id,
                ..new_doctor
            })?;
            if doctor.is_none() {
                warn!(
                    "event=doctor_onboard module=service status=error user_id={} error_code=doctor_rejected",
                    user.id
                );
            }
        }

        Ok(Some(user))
    }

    /// Adds a patient profile, which marks the patient as purchased.
    pub fn attach_patient_info(
        &self,
        user: &User,
        name: &str,
    ) -> ServiceResult<Option<UserInfo>> {
        if user.role != UserRole::Normal {
            return Err(ServiceError::InvalidInput(format!(
                "user {} is not a patient",
                user.id
            )));
        }
        Ok(self.infos.create_with_auto_id(NewUserInfo {
            user_id: user.id,
            name: name.to_string(),
            user_type: InfoUserType::Patient,
            role: Some(UserRole::Normal.label().to_string()),
            department: None,
        })?)
    }

    /// Renames a user; notable for the search index.
    pub fn rename_user(&self, user: &mut User, name: &str) -> RepoResult<()> {
        self.users.update(user, &UserPatch::rename(name))
    }

    pub fn update_profile(&self, user: &mut User, patch: &UserPatch) -> RepoResult<()> {
        self.users.update(user, patch)
    }

    /// Soft-deletes a user; always notifies the search index.
    pub fn remove_user(&self, user: &mut User) -> RepoResult<()> {
        self.users.delete(user)
    }

    pub fn doctor_for_user(&self, user_id: EntityId) -> RepoResult<Option<Doctor>> {
        self.queries.find_doctor_by_user(user_id)
    }
}

/// 64 hex characters from two random v4 uuids.
fn generate_api_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
