//! User account model and its coded enumerations.
//!
//! # Responsibility
//! - Define the account record shared by patients, doctors and staff.
//! - Carry the numeric codes and display labels stored in `users`.
//!
//! # Invariants
//! - Users are soft-deleted; a tombstoned user never verifies.
//! - JSON output and change-event payloads expose only `USER_VISIBLE_FIELDS`.
//!   Credentials, codes and audit columns stay private.
//! - A rename is notable for the `user` search index.

use crate::event::notifier::{FieldNotifier, Notifier};
use crate::model::entity::{
    require_non_blank, AuditStamps, Entity, EntityId, EntityPatch, ValidationError,
};
use crate::model::field::FieldChange;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,64}$").expect("valid username regex"));
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("valid mobile regex"));

/// Attributes present in [`User`] JSON; the only ones that may leave the
/// process, in serialized records or in change events.
pub const USER_VISIBLE_FIELDS: [&str; 5] = ["mobile", "name", "username", "icon_url", "email"];

static USER_NOTIFIER: FieldNotifier =
    FieldNotifier::new("user", &["name"]).exposing(&USER_VISIBLE_FIELDS);

/// Account lifecycle status.
///
/// Codes 4, 8, 16, ... are reserved for further abnormal states. The
/// `users.status` CHECK only admits the codes below, so a new state needs
/// both a variant here and a migration widening the constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserStatus {
    Normal,
    Inactivated,
    Disabled,
}

impl UserStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Inactivated => 1,
            Self::Disabled => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Inactivated),
            2 => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "正常",
            Self::Inactivated => "未激活",
            Self::Disabled => "已禁用",
        }
    }
}

/// Account role. Codes are single bits so role sets can be stored as masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    /// Patient / ordinary member.
    Normal,
    /// Medical assistant.
    Ma,
    /// Patient assistant.
    Pa,
    Doctor,
    /// Company employee.
    Staff,
}

/// Roles that may administer a doctor studio.
pub const HSO_ADMIN_ROLES: [UserRole; 4] =
    [UserRole::Doctor, UserRole::Staff, UserRole::Ma, UserRole::Pa];

/// Roles with platform-wide administration rights.
pub const YK_ADMIN_ROLES: [UserRole; 2] = [UserRole::Doctor, UserRole::Staff];

/// Roles created through the staff onboarding flow.
pub const STAFF_ROLES: [UserRole; 3] = [UserRole::Ma, UserRole::Pa, UserRole::Staff];

impl UserRole {
    pub fn code(self) -> i64 {
        match self {
            Self::Normal => 1,
            Self::Ma => 2,
            Self::Pa => 4,
            Self::Doctor => 8,
            Self::Staff => 16,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Normal),
            2 => Some(Self::Ma),
            4 => Some(Self::Pa),
            8 => Some(Self::Doctor),
            16 => Some(Self::Staff),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "普通用户",
            Self::Ma => "MA",
            Self::Pa => "PA",
            Self::Doctor => "医生",
            Self::Staff => "公司员工",
        }
    }

    pub fn is_staff(self) -> bool {
        STAFF_ROLES.contains(&self)
    }

    /// Department a staff member of this role is filed under.
    pub fn department(self) -> Option<&'static str> {
        match self {
            Self::Ma => Some("医疗助理部"),
            Self::Pa => Some("患者助理部"),
            Self::Staff => Some("运营部"),
            Self::Normal | Self::Doctor => None,
        }
    }
}

/// Kind of account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserType {
    Personal,
    Group,
    Enterprise,
}

impl UserType {
    pub fn code(self) -> i64 {
        match self {
            Self::Personal => 1,
            Self::Group => 2,
            Self::Enterprise => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Personal),
            2 => Some(Self::Group),
            4 => Some(Self::Enterprise),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Personal => "个人用户",
            Self::Group => "团体用户",
            Self::Enterprise => "企业用户",
        }
    }
}

/// Service lines a patient can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    HomeVisit,
    GlobalReferral,
}

impl ServiceKind {
    pub fn code(self) -> i64 {
        match self {
            Self::HomeVisit => 1,
            Self::GlobalReferral => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::HomeVisit),
            2 => Some(Self::GlobalReferral),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HomeVisit => "上门服务",
            Self::GlobalReferral => "全球转诊服务",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseState {
    Purchased,
    NotPurchased,
}

impl PurchaseState {
    pub fn code(self) -> i64 {
        match self {
            Self::Purchased => 1,
            Self::NotPurchased => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Purchased),
            2 => Some(Self::NotPurchased),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Purchased => "已购买",
            Self::NotPurchased => "未购买",
        }
    }
}

/// Account record stored in `users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(skip)]
    pub id: EntityId,
    pub mobile: Option<String>,
    /// Display name; the field the search index cares about.
    pub name: String,
    pub username: Option<String>,
    pub icon_url: Option<String>,
    pub email: Option<String>,
    /// WeChat open id for accounts created through WeChat login.
    #[serde(skip)]
    pub openid: Option<String>,
    /// Already-hashed credential; hashing policy lives outside this crate.
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip)]
    pub api_token: Option<String>,
    #[serde(skip)]
    pub sms_code: Option<String>,
    #[serde(skip)]
    pub role: UserRole,
    #[serde(skip)]
    pub status: UserStatus,
    #[serde(skip)]
    pub audit: AuditStamps,
}

/// Creation input for [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub role: UserRole,
    pub status: UserStatus,
    pub name: String,
    pub username: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub icon_url: Option<String>,
    pub openid: Option<String>,
    pub password_hash: Option<String>,
    pub api_token: Option<String>,
    pub sms_code: Option<String>,
}

impl NewUser {
    /// Starts a normal-status account with the given role and no profile.
    pub fn new(role: UserRole) -> Self {
        Self {
            role,
            status: UserStatus::Normal,
            name: String::new(),
            username: None,
            mobile: None,
            email: None,
            icon_url: None,
            openid: None,
            password_hash: None,
            api_token: None,
            sms_code: None,
        }
    }
}

/// Fields that may be changed on an existing [`User`].
///
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub icon_url: Option<String>,
    pub sms_code: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl EntityPatch for UserPatch {
    fn changes(&self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if let Some(name) = &self.name {
            changes.push(FieldChange::new("name", name.as_str()));
        }
        if let Some(mobile) = &self.mobile {
            changes.push(FieldChange::new("mobile", mobile.as_str()));
        }
        if let Some(email) = &self.email {
            changes.push(FieldChange::new("email", email.as_str()));
        }
        if let Some(icon_url) = &self.icon_url {
            changes.push(FieldChange::new("icon_url", icon_url.as_str()));
        }
        if let Some(sms_code) = &self.sms_code {
            changes.push(FieldChange::new("sms_code", sms_code.as_str()));
        }
        if let Some(role) = self.role {
            changes.push(FieldChange::new("role", role.code()));
        }
        if let Some(status) = self.status {
            changes.push(FieldChange::new("status", status.code()));
        }
        changes
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const KIND: &'static str = "user";
    const SOFT_DELETE: bool = true;

    type New = NewUser;
    type Patch = UserPatch;

    fn from_new(new: NewUser, now_ms: i64) -> Self {
        Self {
            id: 0,
            mobile: new.mobile,
            name: new.name,
            username: new.username,
            icon_url: new.icon_url,
            email: new.email,
            openid: new.openid,
            password_hash: new.password_hash,
            api_token: new.api_token,
            sms_code: new.sms_code,
            role: new.role,
            status: new.status,
            audit: AuditStamps::created(now_ms),
        }
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn audit(&self) -> &AuditStamps {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditStamps {
        &mut self.audit
    }

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(mobile) = &patch.mobile {
            self.mobile = Some(mobile.clone());
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(icon_url) = &patch.icon_url {
            self.icon_url = Some(icon_url.clone());
        }
        if let Some(sms_code) = &patch.sms_code {
            self.sms_code = Some(sms_code.clone());
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    fn notifier() -> &'static dyn Notifier {
        &USER_NOTIFIER
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(username) = &self.username {
            if !USERNAME_RE.is_match(username) {
                return Err(ValidationError::new(
                    "username",
                    "expected 3-64 characters from [A-Za-z0-9_.-]",
                ));
            }
        }
        if let Some(mobile) = &self.mobile {
            if !MOBILE_RE.is_match(mobile) {
                return Err(ValidationError::new(
                    "mobile",
                    "expected an 11-digit mobile number",
                ));
            }
        }
        if let Some(email) = &self.email {
            require_non_blank("email", email)?;
            if !email.contains('@') {
                return Err(ValidationError::new("email", "missing `@`"));
            }
        }
        if self.username.is_none() && self.openid.is_none() && self.mobile.is_none() {
            return Err(ValidationError::new(
                "username",
                "one of username, openid or mobile is required",
            ));
        }
        Ok(())
    }
}
