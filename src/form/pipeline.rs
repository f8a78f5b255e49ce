use futures::future::join_all;
use tracing::debug;

use super::events::FormEvent;
use super::handle::FormHandle;
use super::tree::NodeId;
use super::validation::{FieldContext, Validity};

impl FormHandle {
    /// Computes a field's validity without caching it: the required check
    /// first, then the configured validator.
    pub async fn validate(&self, id: NodeId) -> Validity {
        let Some((value, blank, allow_blank, validator, context, required)) = self.read(|tree| {
            let field = tree.field(id)?;
            let node = tree.node(id)?;
            Some((
                field.get_value(),
                field.is_blank(),
                field.allow_blank,
                field.validator.clone(),
                FieldContext {
                    id,
                    name: field.name.clone(),
                    label: node.label.clone(),
                },
                tree.options.messages.required.to_string(),
            ))
        }) else {
            return Validity::Valid;
        };
        if !allow_blank && blank {
            return Validity::invalid(required);
        }
        match validator {
            Some(validator) => validator.validate(value, context).await,
            None => Validity::Valid,
        }
    }

    /// Validates a field, caches the outcome and reflects it as an error.
    /// Disabled fields are valid without running anything.
    pub async fn field_is_valid(&self, id: NodeId) -> bool {
        if self.read(|tree| tree.is_disabled(id)) {
            return true;
        }
        let outcome = self.validate(id).await;
        let valid = outcome.is_valid();
        self.update(|tree| {
            let message = outcome.message().map(str::to_string);
            if let Some(field) = tree.field_mut(id) {
                field.validation_result = outcome;
            }
            tree.set_error(id, !valid, message);
        });
        valid
    }

    /// Validates every enabled leaf under `id` one after another, so a
    /// group still being populated is read as it stands at each step.
    pub async fn is_valid(&self, id: NodeId) -> bool {
        let fields = self.read(|tree| tree.fields_under(id));
        let mut valid = true;
        for field in fields {
            if self.read(|tree| tree.node(field).is_none() || tree.is_disabled(field)) {
                continue;
            }
            valid &= self.field_is_valid(field).await;
        }
        valid
    }

    /// Validates all enabled leaves of the tree concurrently, without
    /// short-circuiting.
    pub async fn validate_all(&self) -> bool {
        let fields = self.read(|tree| {
            tree.get_fields()
                .into_iter()
                .filter(|field| !tree.is_disabled(*field))
                .collect::<Vec<_>>()
        });
        let outcomes = join_all(fields.iter().map(|field| self.field_is_valid(*field))).await;
        let valid = outcomes.iter().all(|valid| *valid);
        debug!(fields = fields.len(), valid, "validated form");
        valid
    }

    /// First field in document order whose cached outcome is an error.
    pub fn first_error_field(&self) -> Option<NodeId> {
        self.read(|tree| {
            tree.get_fields()
                .into_iter()
                .find(|field| tree.has_error(*field))
        })
    }

    pub fn scroll_to_error_field(&self) -> Option<NodeId> {
        let target = self.first_error_field()?;
        self.update(|tree| tree.push_event(FormEvent::ScrollTo(target)));
        Some(target)
    }
}
