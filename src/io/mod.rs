//! Reading definitions and data documents, writing payloads.

mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{load_definition, parse_document_any, parse_document_str, parse_form_definition};
pub use output::{OutputDestination, OutputOptions, emit, render};
