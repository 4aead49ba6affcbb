//! Profile rows attached to patient and staff accounts.
//!
//! A patient with a profile row counts as a purchased member.

use crate::event::notifier::{Notifier, NoopNotifier};
use crate::model::entity::{AuditStamps, Entity, EntityId, EntityPatch};
use crate::model::field::FieldChange;
use serde::Serialize;

static USER_INFO_NOTIFIER: NoopNotifier = NoopNotifier;

/// Who a profile row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoUserType {
    Patient,
    Staff,
}

impl InfoUserType {
    pub fn code(self) -> i64 {
        match self {
            Self::Patient => 1,
            Self::Staff => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Patient),
            2 => Some(Self::Staff),
            _ => None,
        }
    }
}

/// Profile record stored in `user_infos`, at most one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: EntityId,
    pub user_id: EntityId,
    pub name: String,
    pub user_type: InfoUserType,
    /// Role display label, e.g. `MA`.
    pub role: Option<String>,
    pub department: Option<String>,
    #[serde(skip)]
    pub audit: AuditStamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserInfo {
    pub user_id: EntityId,
    pub name: String,
    pub user_type: InfoUserType,
    pub role: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfoPatch {
    pub name: Option<String>,
    pub department: Option<String>,
}

impl EntityPatch for UserInfoPatch {
    fn changes(&self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if let Some(name) = &self.name {
            changes.push(FieldChange::new("name", name.as_str()));
        }
        if let Some(department) = &self.department {
            changes.push(FieldChange::new("department", department.as_str()));
        }
        changes
    }
}

impl Entity for UserInfo {
    const TABLE: &'static str = "user_infos";
    const KIND: &'static str = "user_info";
    const SOFT_DELETE: bool = true;

    type New = NewUserInfo;
    type Patch = UserInfoPatch;

    fn from_new(new: NewUserInfo, now_ms: i64) -> Self {
        Self {
            id: 0,
            user_id: new.user_id,
            name: new.name,
            user_type: new.user_type,
            role: new.role,
            department: new.department,
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

    fn apply_patch(&mut self, patch: &UserInfoPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(department) = &patch.department {
            self.department = Some(department.clone());
        }
    }

    fn notifier() -> &'static dyn Notifier {
        &USER_INFO_NOTIFIER
    }
}
