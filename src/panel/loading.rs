use indexmap::IndexMap;
use tracing::debug;

/// Per-requester loading flags. The panel is busy while any flag is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    requesters: IndexMap<String, bool>,
    /// Visible message and the requester that raised it.
    message: Option<(String, String)>,
}

impl LoadingState {
    /// Updates one requester's flag. Only a call that starts loading with a
    /// message changes the visible message; the newest one wins.
    pub fn set(&mut self, requester: &str, is_loading: bool, message: Option<String>) {
        self.requesters.insert(requester.to_string(), is_loading);
        if is_loading {
            if let Some(message) = message {
                self.message = Some((requester.to_string(), message));
            }
        } else if self
            .message
            .as_ref()
            .is_some_and(|(owner, _)| owner == requester)
        {
            self.message = None;
        }
        if !self.is_busy() {
            self.message = None;
        }
        debug!(requester, is_loading, busy = self.is_busy(), "loading state changed");
    }

    pub fn is_busy(&self) -> bool {
        self.requesters.values().any(|loading| *loading)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|(_, message)| message.as_str())
    }
}
