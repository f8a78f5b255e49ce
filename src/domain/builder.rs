use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use indexmap::IndexMap;

use crate::form::{
    CompositeConfig, DefinitionError, FieldConfig, FormHandle, NodeId, NumericTuning,
    PatternValidator, SchemaValidator, SelectionState, SharedValidator, ValidatorChain,
};
use crate::options::FormOptions;
use crate::store::{MemoryStore, Record, RecordLoader, Store, TreeStore};

use super::definition::{
    FieldDefinition, FormDefinition, GroupDefinition, ItemDefinition, SelectionDefinition,
    StoreDefinition, ValidatorDefinition,
};

/// Builds a live form from a definition.
pub fn build_form(
    definition: &FormDefinition,
    mut options: FormOptions,
) -> Result<FormHandle, DefinitionError> {
    if let Some(required) = &definition.messages.required {
        options.messages.required = required.clone().into();
    }
    if let Some(please_wait) = &definition.messages.please_wait {
        options.messages.please_wait = please_wait.clone().into();
    }
    let mut defaults = definition.defaults.clone();
    defaults.inherit(&options.defaults);
    options.defaults = defaults;

    let stores = definition
        .stores
        .iter()
        .map(|(name, store)| (name.clone(), build_store(store)))
        .collect::<IndexMap<_, _>>();

    let form = FormHandle::with_options(options);
    let builder = Builder {
        form: &form,
        stores: &stores,
    };
    for item in &definition.items {
        builder.item(None, item)?;
    }
    form.update(|tree| tree.set_defaults());
    Ok(form)
}

fn build_store(definition: &StoreDefinition) -> Rc<dyn Store> {
    match definition {
        StoreDefinition::Memory { records, deferred } if *deferred => {
            let records = records.clone();
            let loader: RecordLoader = Rc::new(move || {
                let records = records.clone();
                Box::pin(async move { Ok(records) }) as LocalBoxFuture<'static, Result<Vec<Record>>>
            });
            Rc::new(MemoryStore::with_loader(loader))
        }
        StoreDefinition::Memory { records, .. } => Rc::new(MemoryStore::new(records.clone())),
        StoreDefinition::Tree {
            id_field,
            roots,
            deferred,
        } => {
            if *deferred {
                Rc::new(TreeStore::deferred(id_field.clone(), roots.clone()))
            } else {
                Rc::new(TreeStore::new(id_field.clone(), roots.clone()))
            }
        }
    }
}

struct Builder<'a> {
    form: &'a FormHandle,
    stores: &'a IndexMap<String, Rc<dyn Store>>,
}

impl Builder<'_> {
    fn item(&self, parent: Option<NodeId>, item: &ItemDefinition) -> Result<(), DefinitionError> {
        match item {
            ItemDefinition::Field(field) => {
                let config = field_config(field)?;
                self.form.update(|tree| tree.add_field(parent, config))?;
            }
            ItemDefinition::Selection(selection) => {
                let config = self.selection_config(selection)?;
                self.form.add_selection(parent, config)?;
            }
            ItemDefinition::Container(group) => {
                let id = self
                    .form
                    .update(|tree| tree.add_container(parent, group_config(group)))?;
                self.items(id, &group.items)?;
            }
            ItemDefinition::FieldSet(group) => {
                let id = self
                    .form
                    .update(|tree| tree.add_fieldset(parent, group_config(group)))?;
                self.items(id, &group.items)?;
            }
        }
        Ok(())
    }

    fn items(&self, parent: NodeId, items: &[ItemDefinition]) -> Result<(), DefinitionError> {
        for item in items {
            self.item(Some(parent), item)?;
        }
        Ok(())
    }

    fn selection_config(
        &self,
        definition: &SelectionDefinition,
    ) -> Result<FieldConfig, DefinitionError> {
        let store = self
            .stores
            .get(&definition.store)
            .cloned()
            .ok_or_else(|| DefinitionError::UnknownStore(definition.store.clone()))?;
        let search_field = definition
            .search_field
            .clone()
            .unwrap_or_else(|| definition.display_field.clone());
        let state = SelectionState::new(store)
            .with_value_field(definition.value_field.clone())
            .with_display_field(definition.display_field.clone())
            .with_search(search_field, definition.search_operator)
            .multiple(definition.multiple)
            .searchable(definition.searchable);
        let mut config = FieldConfig::new(definition.name.clone())
            .allow_blank(definition.allow_blank)
            .disabled(definition.disabled)
            .selection(state);
        config.label = definition.label.clone();
        config.value = definition.value.clone();
        Ok(config)
    }
}

fn group_config(group: &GroupDefinition) -> CompositeConfig {
    CompositeConfig {
        label: group.label.clone(),
        layout: group.layout.clone(),
        disabled: group.disabled,
    }
}

fn field_config(definition: &FieldDefinition) -> Result<FieldConfig, DefinitionError> {
    let input_name = if definition.exclude {
        None
    } else {
        Some(
            definition
                .input_name
                .clone()
                .unwrap_or_else(|| definition.name.clone()),
        )
    };
    let mut config = FieldConfig::new(definition.name.clone())
        .with_input_name(input_name)
        .allow_blank(definition.allow_blank)
        .disabled(definition.disabled)
        .with_layout(definition.layout.clone());
    config.label = definition.label.clone();
    config.value = definition.value.clone();

    let validators = definition
        .validators
        .iter()
        .map(build_validator)
        .collect::<Result<Vec<_>>>()
        .map_err(|err| DefinitionError::InvalidField {
            field: definition.name.clone(),
            message: format!("{err:#}"),
        })?;
    if !validators.is_empty() {
        config = config.with_validator(Rc::new(ValidatorChain::new(validators)));
    }

    if let Some(number) = &definition.number {
        let mut tuning = NumericTuning::default().with_bounds(number.min, number.max);
        if number.float {
            tuning = tuning.floats();
        }
        if let Some(step) = number.step {
            tuning = if number.float {
                tuning.with_float_step(step)
            } else {
                tuning.with_integer_step(step as i64)
            };
        }
        config = config.number(tuning);
    } else if let Some(radio) = &definition.radio {
        config = config.radio(radio.group.clone(), radio.option.clone());
    }
    Ok(config)
}

fn build_validator(definition: &ValidatorDefinition) -> Result<SharedValidator> {
    Ok(match definition {
        ValidatorDefinition::Pattern { pattern, message } => {
            Rc::new(PatternValidator::new(pattern, message.clone())?)
        }
        ValidatorDefinition::Schema { schema, message } => {
            Rc::new(SchemaValidator::new(schema, message.clone())?)
        }
    })
}
