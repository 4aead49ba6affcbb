//! Per-kind notability rules.
//!
//! The generic write path asks the entity's notifier what to publish; the
//! notifier never touches the database or the dispatcher itself.

use crate::event::change::{ChangeEvent, ChangeOp};
use crate::model::entity::EntityId;
use crate::model::field::ChangedFields;

/// Decides whether a mutation of one entity kind must reach the search index.
pub trait Notifier: Send + Sync {
    /// Search-index type label, or `None` for kinds without an index.
    fn index_kind(&self) -> Option<&'static str>;

    /// Whether an update touching `changed` is relevant to the index.
    fn is_notable(&self, changed: &ChangedFields) -> bool;

    /// Attributes of a notable update that may leave the process.
    fn payload(&self, changed: &ChangedFields) -> ChangedFields {
        changed.clone()
    }

    /// Builds the event for one mutation, or `None` when nothing is published.
    ///
    /// Updates publish only when notable and carry the changed attributes
    /// that pass [`Notifier::payload`]. Deletes of indexed kinds always
    /// publish, without attributes.
    fn on_mutate(
        &self,
        entity_id: EntityId,
        op: ChangeOp,
        changed: &ChangedFields,
    ) -> Option<ChangeEvent> {
        let kind = self.index_kind()?;
        match op {
            ChangeOp::Update => self
                .is_notable(changed)
                .then(|| ChangeEvent::updated(kind, entity_id, self.payload(changed))),
            ChangeOp::Delete => Some(ChangeEvent::deleted(kind, entity_id)),
        }
    }
}

/// Notifier for indexed kinds whose rule is "any of these fields changed".
///
/// Payloads carry every changed attribute unless restricted with
/// [`FieldNotifier::exposing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldNotifier {
    kind: &'static str,
    fields: &'static [&'static str],
    exposed: Option<&'static [&'static str]>,
}

impl FieldNotifier {
    pub const fn new(kind: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            kind,
            fields,
            exposed: None,
        }
    }

    /// Restricts event payloads to `exposed` attributes.
    pub const fn exposing(self, exposed: &'static [&'static str]) -> Self {
        Self {
            exposed: Some(exposed),
            ..self
        }
    }
}

impl Notifier for FieldNotifier {
    fn index_kind(&self) -> Option<&'static str> {
        Some(self.kind)
    }

    fn is_notable(&self, changed: &ChangedFields) -> bool {
        self.fields
            .iter()
            .any(|field| changed.contains_key(*field))
    }

    fn payload(&self, changed: &ChangedFields) -> ChangedFields {
        match self.exposed {
            Some(exposed) => changed
                .iter()
                .filter(|(key, _)| exposed.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            None => changed.clone(),
        }
    }
}

/// Notifier for kinds that have no external index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn index_kind(&self) -> Option<&'static str> {
        None
    }

    fn is_notable(&self, _changed: &ChangedFields) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldNotifier, NoopNotifier, Notifier};
    use crate::event::change::ChangeOp;
    use crate::model::field::ChangedFields;
    use serde_json::json;

    fn fields(pairs: &[(&str, &str)]) -> ChangedFields {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), json!(value)))
            .collect()
    }

    #[test]
    fn name_change_is_notable_and_carries_all_changes() {
        let notifier = FieldNotifier::new("user", &["name"]);
        let changed = fields(&[("name", "X"), ("email", "x@example.com")]);

        let event = notifier
            .on_mutate(5, ChangeOp::Update, &changed)
            .expect("name change should publish");
        assert_eq!(event.entity_kind(), "user");
        assert_eq!(event.entity_id(), 5);
        assert_eq!(event.op(), ChangeOp::Update);
        assert_eq!(event.attributes(), &changed);
    }

    #[test]
    fn other_fields_are_skipped() {
        let notifier = FieldNotifier::new("user", &["name"]);
        let changed = fields(&[("mobile", "13800138000")]);
        assert!(notifier.on_mutate(5, ChangeOp::Update, &changed).is_none());
    }

    #[test]
    fn exposed_list_strips_private_attributes() {
        let notifier = FieldNotifier::new("user", &["name"]).exposing(&["name", "email"]);
        let changed = fields(&[("name", "X"), ("sms_code", "1234"), ("email", "x@y.cn")]);
        let event = notifier
            .on_mutate(5, ChangeOp::Update, &changed)
            .expect("name change should publish");
        assert_eq!(
            event.attributes(),
            &fields(&[("name", "X"), ("email", "x@y.cn")])
        );
    }

    #[test]
    fn delete_always_publishes_for_indexed_kinds() {
        let notifier = FieldNotifier::new("studio", &["name"]);
        let event = notifier
            .on_mutate(9, ChangeOp::Delete, &ChangedFields::new())
            .expect("delete should publish");
        assert_eq!(event.op(), ChangeOp::Delete);
        assert!(event.attributes().is_empty());
    }

    #[test]
    fn noop_notifier_never_publishes() {
        let changed = fields(&[("name", "X")]);
        assert!(NoopNotifier.on_mutate(1, ChangeOp::Update, &changed).is_none());
        assert!(NoopNotifier
            .on_mutate(1, ChangeOp::Delete, &ChangedFields::new())
            .is_none());
    }
}
