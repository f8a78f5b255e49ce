use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Horizontal alignment of field labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAlign {
    Left,
    Right,
    Top,
}

/// Layout values shared down the tree by `set_defaults`.
///
/// Unset entries inherit from the nearest composite that sets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutDefaults {
    pub label_width: Option<u32>,
    pub label_align: Option<LabelAlign>,
    pub input_width: Option<u32>,
}

impl LayoutDefaults {
    pub fn with_label_width(mut self, width: u32) -> Self {
        self.label_width = Some(width);
        self
    }

    pub fn with_label_align(mut self, align: LabelAlign) -> Self {
        self.label_align = Some(align);
        self
    }

    pub fn with_input_width(mut self, width: u32) -> Self {
        self.input_width = Some(width);
        self
    }

    /// Fill every unset entry from `parent`.
    pub fn inherit(&mut self, parent: &LayoutDefaults) {
        if self.label_width.is_none() {
            self.label_width = parent.label_width;
        }
        if self.label_align.is_none() {
            self.label_align = parent.label_align;
        }
        if self.input_width.is_none() {
            self.input_width = parent.input_width;
        }
    }
}

/// User-facing strings produced by the toolkit itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub required: Cow<'static, str>,
    pub please_wait: Cow<'static, str>,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            required: Cow::Borrowed("This field is required"),
            please_wait: Cow::Borrowed("Please wait for the current request to finish"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormOptions {
    pub messages: Messages,
    pub defaults: LayoutDefaults,
}

impl FormOptions {
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_required_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.messages.required = message.into();
        self
    }

    pub fn with_please_wait_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.messages.please_wait = message.into();
        self
    }

    pub fn with_defaults(mut self, defaults: LayoutDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}
