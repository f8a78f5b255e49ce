use serde_json::Value;

use crate::panel::Response;
use crate::store::RecordIndex;

use super::tree::NodeId;

/// Notifications a presentation layer can subscribe to through
/// [`FormHandle::subscribe`](super::FormHandle::subscribe).
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// A field committed a value that differs from its previous one, or a
    /// top-level field toggled its disabled state.
    Change {
        field: NodeId,
        value: Value,
        previous: Value,
    },
    /// The visible help text of a field or container was recomputed.
    ErrorChanged { node: NodeId, help: Option<String> },
    Loading { busy: bool, message: Option<String> },
    /// Transient modal notice, e.g. the single-flight "please wait".
    Notice(String),
    ScrollTo(NodeId),
    Expanded {
        field: NodeId,
        indices: Vec<RecordIndex>,
    },
    Load { response: Option<Response> },
    Submit { response: Option<Response> },
}
