//! Doctor studio: a practice that groups doctors, assistants and patients.

use crate::event::notifier::{FieldNotifier, Notifier};
use crate::model::entity::{
    require_non_blank, AuditStamps, Entity, EntityId, EntityPatch, ValidationError,
};
use crate::model::field::FieldChange;
use serde::Serialize;

static STUDIO_NOTIFIER: FieldNotifier = FieldNotifier::new("studio", &["name"]);

/// Studio record stored in `doctor_studios`; indexed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorStudio {
    pub id: EntityId,
    pub name: String,
    pub owner_id: Option<EntityId>,
    pub description: Option<String>,
    #[serde(skip)]
    pub audit: AuditStamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDoctorStudio {
    pub name: String,
    pub owner_id: Option<EntityId>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorStudioPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl EntityPatch for DoctorStudioPatch {
    fn changes(&self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if let Some(name) = &self.name {
            changes.push(FieldChange::new("name", name.as_str()));
        }
        if let Some(description) = &self.description {
            changes.push(FieldChange::new("description", description.as_str()));
        }
        changes
    }
}

impl Entity for DoctorStudio {
    const TABLE: &'static str = "doctor_studios";
    const KIND: &'static str = "studio";
    const SOFT_DELETE: bool = true;

    type New = NewDoctorStudio;
    type Patch = DoctorStudioPatch;

    fn from_new(new: NewDoctorStudio, now_ms: i64) -> Self {
        Self {
            id: 0,
            name: new.name,
            owner_id: new.owner_id,
            description: new.description,
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

    fn apply_patch(&mut self, patch: &DoctorStudioPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
    }

    fn notifier() -> &'static dyn Notifier {
        &STUDIO_NOTIFIER
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)
    }
}
