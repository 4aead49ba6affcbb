//! Change event payload.

use crate::model::entity::EntityId;
use crate::model::field::ChangedFields;
use serde::{Deserialize, Serialize};

/// Kind of write that produced a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Notification that an indexed record changed.
///
/// Fields are private so an event cannot be altered after the write path
/// built it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    entity_kind: String,
    entity_id: EntityId,
    op: ChangeOp,
    #[serde(default, skip_serializing_if = "ChangedFields::is_empty")]
    attributes: ChangedFields,
}

impl ChangeEvent {
    /// Update event carrying the changed attributes.
    pub fn updated(
        entity_kind: impl Into<String>,
        entity_id: EntityId,
        attributes: ChangedFields,
    ) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            entity_id,
            op: ChangeOp::Update,
            attributes,
        }
    }

    /// Delete event; never carries attributes.
    pub fn deleted(entity_kind: impl Into<String>, entity_id: EntityId) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            entity_id,
            op: ChangeOp::Delete,
            attributes: ChangedFields::new(),
        }
    }

    pub fn entity_kind(&self) -> &str {
        &self.entity_kind
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn op(&self) -> ChangeOp {
        self.op
    }

    pub fn attributes(&self) -> &ChangedFields {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeEvent, ChangeOp};
    use crate::model::field::ChangedFields;
    use serde_json::json;

    #[test]
    fn update_event_serializes_with_attributes() {
        let mut attributes = ChangedFields::new();
        attributes.insert("name".to_string(), json!("张三"));
        let event = ChangeEvent::updated("user", 7, attributes);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "entity_kind": "user",
                "entity_id": 7,
                "op": "update",
                "attributes": {"name": "张三"},
            })
        );
        assert!(serde_json::to_string(&event).unwrap().contains("张三"));
    }

    #[test]
    fn delete_event_omits_attributes_and_parses_back() {
        let event = ChangeEvent::deleted("studio", 3);
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("attributes"));

        let parsed: ChangeEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.op(), ChangeOp::Delete);
        assert_eq!(parsed.entity_id(), 3);
        assert!(parsed.attributes().is_empty());
    }
}
