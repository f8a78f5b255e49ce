
use serde_json::Value;

use crate::store::Record;

pub(crate) fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}
