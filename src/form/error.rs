use thiserror::Error;

use super::tree::NodeId;

/// Failures while assembling a field tree.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("field name '{0}' is already registered")]
    DuplicateName(String),
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} cannot hold children")]
    InvalidParent(NodeId),
    #[error("store '{0}' is not defined")]
    UnknownStore(String),
    #[error("field '{field}': {message}")]
    InvalidField { field: String, message: String },
}
