mod composite;
mod error;
mod events;
mod field;
mod handle;
mod pipeline;
mod selection;
mod spin;
mod tree;
mod validation;

pub use composite::{CompositeState, ErrorEntry};
pub use error::DefinitionError;
pub use events::FormEvent;
pub use field::{FieldConfig, FieldRole, FieldState, is_blank_value};
pub use handle::FormHandle;
pub use selection::{SearchState, SelectionState};
pub use spin::{NumericTuning, Sleeper, SpinDirection, SpinRepeat};
pub use tree::{CompositeConfig, FormTree, Node, NodeId, NodeKind};
pub use validation::{
    FieldContext, PatternValidator, SchemaValidator, SharedValidator, Validator, ValidatorChain,
    Validity,
};
