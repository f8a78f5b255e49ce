use serde_json::{Map, Value};

use crate::options::LayoutDefaults;

use super::selection::SelectionState;
use super::spin::NumericTuning;
use super::validation::{SharedValidator, Validity};

/// What a field does beyond the shared value contract.
#[derive(Debug)]
pub enum FieldRole {
    Plain,
    Number(NumericTuning),
    /// Member of a radio-style group: holds `option` while checked, null otherwise.
    Radio { group: String, option: Value },
    Selection(Box<SelectionState>),
}

/// Construction-time description of a field.
#[derive(Debug)]
pub struct FieldConfig {
    pub name: String,
    pub input_name: Option<String>,
    pub label: Option<String>,
    pub value: Option<Value>,
    pub allow_blank: bool,
    pub disabled: bool,
    pub validator: Option<SharedValidator>,
    pub layout: LayoutDefaults,
    pub role: FieldRole,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            input_name: Some(name.clone()),
            name,
            label: None,
            value: None,
            allow_blank: true,
            disabled: false,
            validator: None,
            layout: LayoutDefaults::default(),
            role: FieldRole::Plain,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_input_name(mut self, input_name: Option<String>) -> Self {
        self.input_name = input_name;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn allow_blank(mut self, allow: bool) -> Self {
        self.allow_blank = allow;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_validator(mut self, validator: SharedValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_layout(mut self, layout: LayoutDefaults) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    pub fn number(self, tuning: NumericTuning) -> Self {
        self.with_role(FieldRole::Number(tuning))
    }

    pub fn radio(self, group: impl Into<String>, option: Value) -> Self {
        self.with_role(FieldRole::Radio {
            group: group.into(),
            option,
        })
    }

    pub fn selection(self, state: SelectionState) -> Self {
        self.with_role(FieldRole::Selection(Box::new(state)))
    }
}

#[derive(Debug)]
pub struct FieldState {
    pub(crate) name: String,
    pub(crate) input_name: Option<String>,
    pub(crate) allow_blank: bool,
    pub(crate) validator: Option<SharedValidator>,
    value: Option<Value>,
    previous_value: Option<Value>,
    origin_value: Option<Value>,
    pub(crate) validation_result: Validity,
    pub(crate) error_visible: bool,
    pub(crate) help: Option<String>,
    pub(crate) role: FieldRole,
}

impl FieldState {
    /// Builds the state from a config; the configured value is the
    /// provisional origin and fires nothing.
    pub(crate) fn from_config(config: FieldConfig) -> (Self, NodeParts) {
        let FieldConfig {
            name,
            input_name,
            label,
            value,
            allow_blank,
            disabled,
            validator,
            layout,
            role,
        } = config;
        let state = Self {
            name,
            input_name,
            allow_blank,
            validator,
            previous_value: value.clone(),
            origin_value: value.clone(),
            value,
            validation_result: Validity::Valid,
            error_visible: false,
            help: None,
            role,
        };
        (
            state,
            NodeParts {
                label,
                layout,
                disabled,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_name(&self) -> Option<&str> {
        self.input_name.as_deref()
    }

    pub fn allows_blank(&self) -> bool {
        self.allow_blank
    }

    pub fn role(&self) -> &FieldRole {
        &self.role
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        match &self.role {
            FieldRole::Selection(state) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn selection_mut(&mut self) -> Option<&mut SelectionState> {
        match &mut self.role {
            FieldRole::Selection(state) => Some(state),
            _ => None,
        }
    }

    /// The committed value, with "never committed" read as null.
    pub fn get_value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    pub fn value_ref(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn origin_value(&self) -> Value {
        self.origin_value.clone().unwrap_or(Value::Null)
    }

    pub fn previous_value(&self) -> Value {
        self.previous_value.clone().unwrap_or(Value::Null)
    }

    pub fn validation_result(&self) -> &Validity {
        &self.validation_result
    }

    /// Reads the cached validation outcome; never re-validates.
    pub fn has_error(&self) -> bool {
        !self.validation_result.is_valid()
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn error_visible(&self) -> bool {
        self.error_visible
    }

    pub fn is_blank(&self) -> bool {
        is_blank_value(self.value.as_ref().unwrap_or(&Value::Null))
    }

    pub fn is_dirty(&self) -> bool {
        self.get_value() != self.origin_value()
    }

    /// Commits `value`. Returns the previous value when the change is
    /// observable, i.e. `value` differs from the last change-detection point.
    pub(crate) fn commit(&mut self, value: Value, is_origin: bool) -> Option<Value> {
        let previous = self.previous_value();
        let changed = previous != value;
        self.value = Some(value.clone());
        if is_origin {
            self.origin_value = Some(value.clone());
        }
        self.previous_value = Some(value);
        changed.then_some(previous)
    }

    /// Single-field building block of value collection.
    pub(crate) fn values(&self, disabled: bool) -> Map<String, Value> {
        let mut values = Map::new();
        if disabled {
            return values;
        }
        if let Some(input_name) = &self.input_name {
            let value = self.get_value();
            if !value.is_null() {
                values.insert(input_name.clone(), value);
            }
        }
        values
    }
}

/// Node-level settings carried by a field config.
#[derive(Debug)]
pub(crate) struct NodeParts {
    pub label: Option<String>,
    pub layout: LayoutDefaults,
    pub disabled: bool,
}

pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => false,
    }
}
