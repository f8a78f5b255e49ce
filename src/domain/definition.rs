use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::LayoutDefaults;
use crate::store::{FilterOperator, Record, TreeNode};

/// Declarative description of a whole form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefinition {
    pub title: Option<String>,
    pub defaults: LayoutDefaults,
    pub messages: MessageOverrides,
    pub stores: IndexMap<String, StoreDefinition>,
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageOverrides {
    pub required: Option<String>,
    pub please_wait: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemDefinition {
    Field(FieldDefinition),
    Selection(SelectionDefinition),
    Container(GroupDefinition),
    #[serde(alias = "fieldset")]
    FieldSet(GroupDefinition),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefinition {
    pub label: Option<String>,
    pub layout: LayoutDefaults,
    pub disabled: bool,
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Overrides `name` when collecting values.
    #[serde(default)]
    pub input_name: Option<String>,
    /// Keeps the field out of collected values.
    #[serde(default)]
    pub exclude: bool,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default = "default_true")]
    pub allow_blank: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub layout: LayoutDefaults,
    #[serde(default)]
    pub validators: Vec<ValidatorDefinition>,
    #[serde(default)]
    pub number: Option<NumberDefinition>,
    #[serde(default)]
    pub radio: Option<RadioDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidatorDefinition {
    Pattern {
        pattern: String,
        message: String,
    },
    Schema {
        schema: Value,
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberDefinition {
    pub float: bool,
    pub step: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioDefinition {
    pub group: String,
    pub option: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDefinition {
    pub name: String,
    /// Key into [`FormDefinition::stores`].
    pub store: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default = "default_true")]
    pub allow_blank: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default = "default_value_field")]
    pub value_field: String,
    #[serde(default = "default_display_field")]
    pub display_field: String,
    #[serde(default)]
    pub search_field: Option<String>,
    #[serde(default)]
    pub search_operator: FilterOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreDefinition {
    Memory {
        records: Vec<Record>,
        /// Records only become visible after the first load.
        #[serde(default)]
        deferred: bool,
    },
    Tree {
        #[serde(default = "default_value_field")]
        id_field: String,
        roots: Vec<TreeNode>,
        #[serde(default)]
        deferred: bool,
    },
}

fn default_true() -> bool {
    true
}

fn default_value_field() -> String {
    "id".to_string()
}

fn default_display_field() -> String {
    "name".to_string()
}
