#![deny(rust_2018_idioms)]
//! Form toolkit: a field tree with value tracking, async validation with
//! error bubbling, store-backed selection fields, and a panel that loads
//! and submits the whole form through a transport.

pub mod domain;
pub mod form;
pub mod io;
pub mod options;
pub mod panel;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{FormDefinition, build_form};
pub use form::{FormEvent, FormHandle, NodeId, Validity};
pub use io::{
    DocumentFormat, OutputDestination, OutputOptions, emit, load_definition, parse_document_str,
};
pub use options::FormOptions;
pub use panel::{FormPanel, FormRequest, Response, StaticTransport, Transport};

pub mod prelude {
    pub use super::form::{
        CompositeConfig, FieldConfig, FormEvent, FormHandle, NodeId, SelectionState, Validity,
    };
    pub use super::options::{FormOptions, LayoutDefaults};
    pub use super::panel::{FormPanel, FormRequest, Response, StaticTransport, Transport};
    pub use super::store::{MemoryStore, Record, Store, TreeStore};
}
