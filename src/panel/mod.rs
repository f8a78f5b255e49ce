//! Top-level load/submit orchestration over a field tree.

mod loading;
mod transport;

use std::{cell::RefCell, rc::Rc};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::form::{FormEvent, FormHandle, NodeId, Validity};

pub use loading::LoadingState;
pub use transport::{FormRequest, PostOptions, PostedRequest, Response, StaticTransport, Transport};

const PANEL_REQUESTER: &str = "panel";

#[derive(Debug)]
pub struct FormPanel {
    form: FormHandle,
    transport: Rc<dyn Transport>,
    loading: RefCell<LoadingState>,
    post_options: PostOptions,
}

impl FormPanel {
    pub fn new(form: FormHandle, transport: Rc<dyn Transport>) -> Self {
        form.update(|tree| tree.set_defaults());
        Self {
            form,
            transport,
            loading: RefCell::default(),
            post_options: PostOptions::default(),
        }
    }

    pub fn with_post_options(mut self, options: PostOptions) -> Self {
        self.post_options = options;
        self
    }

    pub fn form(&self) -> &FormHandle {
        &self.form
    }

    /// Raises or clears one requester's loading flag.
    pub fn set_loading(&self, requester: &str, is_loading: bool, message: Option<String>) {
        let (busy, message) = {
            let mut loading = self.loading.borrow_mut();
            loading.set(requester, is_loading, message);
            (loading.is_busy(), loading.message().map(str::to_string))
        };
        self.form
            .update(|tree| tree.push_event(FormEvent::Loading { busy, message }));
    }

    pub fn is_loading(&self) -> bool {
        self.loading.borrow().is_busy()
    }

    pub fn loading_message(&self) -> Option<String> {
        self.loading.borrow().message().map(str::to_string)
    }

    fn notify_busy(&self) {
        self.form.update(|tree| {
            let notice = tree.options().messages.please_wait.to_string();
            tree.push_event(FormEvent::Notice(notice));
        });
    }

    /// Validates every enabled field concurrently. Refuses while loading.
    pub async fn is_valid(&self) -> bool {
        if self.is_loading() {
            self.notify_busy();
            return false;
        }
        self.form.validate_all().await
    }

    pub fn get_values(&self) -> Map<String, Value> {
        self.form.get_values()
    }

    pub fn is_dirty(&self) -> bool {
        self.form.read(|tree| tree.is_form_dirty())
    }

    /// Rolls every field back to its origin value.
    pub fn reset(&self) {
        self.form.update(|tree| tree.rollback_all());
    }

    pub fn scroll_to_error_field(&self) -> Option<NodeId> {
        self.form.scroll_to_error_field()
    }

    /// Reads field origin values from `request.url`.
    pub async fn load(&self, request: &FormRequest) -> Result<Response> {
        self.set_loading(PANEL_REQUESTER, true, request.message.clone());
        let result = self
            .transport
            .get(&request.url, &request.params)
            .await
            .with_context(|| format!("failed to load form data from '{}'", request.url));
        if let Ok(Response {
            data: Some(Value::Object(data)),
            ..
        }) = &result
        {
            for (name, value) in data {
                match self.form.field_by_name(name) {
                    Some(id) => {
                        self.form.set_value(id, value.clone(), true).await;
                    }
                    None => debug!(field = %name, "no field for loaded key"),
                }
            }
        }
        self.set_loading(PANEL_REQUESTER, false, None);
        let response = result.as_ref().ok().cloned();
        self.form
            .update(|tree| tree.push_event(FormEvent::Load { response }));
        result
    }

    /// Validates and posts the collected values. Refuses without touching
    /// the network while another request is in flight or a field is invalid.
    ///
    /// The panel counts as loading from the start of validation, so a second
    /// submit issued meanwhile is refused.
    pub async fn submit(&self, request: &FormRequest) -> Result<Response> {
        if self.is_loading() {
            self.notify_busy();
            return Ok(Response::failure());
        }
        self.set_loading(PANEL_REQUESTER, true, None);
        if !self.form.validate_all().await {
            self.set_loading(PANEL_REQUESTER, false, None);
            self.scroll_to_error_field();
            return Ok(Response::failure());
        }

        self.set_loading(PANEL_REQUESTER, true, request.message.clone());
        let payload = Value::Object(self.get_values());
        let result = self
            .transport
            .post(&request.url, &payload, &request.params, &self.post_options)
            .await
            .with_context(|| format!("failed to submit form to '{}'", request.url));
        if let Ok(response) = &result
            && !response.success
            && let Some(errors) = &response.errors
        {
            self.apply_server_errors(errors);
        }
        self.set_loading(PANEL_REQUESTER, false, None);
        let response = result.as_ref().ok().cloned();
        self.form
            .update(|tree| tree.push_event(FormEvent::Submit { response }));
        result
    }

    fn apply_server_errors(&self, errors: &indexmap::IndexMap<String, String>) {
        self.form.update(|tree| {
            for (name, message) in errors {
                let Some(id) = tree.field_by_name(name) else {
                    warn!(field = %name, "server error for unknown field");
                    continue;
                };
                if let Some(field) = tree.field_mut(id) {
                    field.validation_result = Validity::invalid(message.clone());
                }
                tree.set_error(id, true, Some(message.clone()));
            }
        });
        self.scroll_to_error_field();
    }
}
