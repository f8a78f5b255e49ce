mod builder;
mod definition;

pub use builder::build_form;
pub use definition::{
    FieldDefinition, FormDefinition, GroupDefinition, ItemDefinition, MessageOverrides,
    NumberDefinition, RadioDefinition, SelectionDefinition, StoreDefinition,
    ValidatorDefinition,
};
