//! Doctor record linked one-to-one to a doctor-role user.

use crate::event::notifier::{Notifier, NoopNotifier};
use crate::model::entity::{
    require_non_blank, AuditStamps, Entity, EntityId, EntityPatch, ValidationError,
};
use crate::model::field::FieldChange;
use serde::Serialize;

static DOCTOR_NOTIFIER: NoopNotifier = NoopNotifier;

/// Doctor record stored in `doctors`. Not searchable on its own; the owning
/// user carries the indexed display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub id: EntityId,
    pub user_id: EntityId,
    pub name: String,
    #[serde(skip)]
    pub audit: AuditStamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoctor {
    pub user_id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorPatch {
    pub name: Option<String>,
}

impl EntityPatch for DoctorPatch {
    fn changes(&self) -> Vec<FieldChange> {
        self.name
            .iter()
            .map(|name| FieldChange::new("name", name.as_str()))
            .collect()
    }
}

impl Entity for Doctor {
    const TABLE: &'static str = "doctors";
    const KIND: &'static str = "doctor";
    const SOFT_DELETE: bool = false;

    type New = NewDoctor;
    type Patch = DoctorPatch;

    fn from_new(new: NewDoctor, now_ms: i64) -> Self {
        Self {
            id: 0,
            user_id: new.user_id,
            name: new.name,
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

    fn apply_patch(&mut self, patch: &DoctorPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
    }

    fn notifier() -> &'static dyn Notifier {
        &DOCTOR_NOTIFIER
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)
    }
}
