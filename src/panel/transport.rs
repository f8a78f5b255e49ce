use std::cell::RefCell;

use anyhow::{Result, anyhow};
use futures::future::{self, LocalBoxFuture};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request shape shared by `load` and `submit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormRequest {
    pub url: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Loading message shown while the request is in flight.
    #[serde(default)]
    pub message: Option<String>,
}

impl FormRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Server reply for both reads and posts. `errors` maps field names to
/// messages on a failed submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            ..Self::default()
        }
    }

    pub fn failure() -> Self {
        Self::default()
    }

    pub fn with_errors(errors: IndexMap<String, String>) -> Self {
        Self {
            success: false,
            errors: Some(errors),
            ..Self::default()
        }
    }
}

/// Extra settings handed to `Transport::post`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostOptions {
    pub headers: IndexMap<String, String>,
}

impl PostOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

pub trait Transport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a Map<String, Value>,
    ) -> LocalBoxFuture<'a, Result<Response>>;

    fn post<'a>(
        &'a self,
        url: &'a str,
        data: &'a Value,
        params: &'a Map<String, Value>,
        options: &'a PostOptions,
    ) -> LocalBoxFuture<'a, Result<Response>>;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Transport")
    }
}

/// A recorded `post` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedRequest {
    pub url: String,
    pub data: Value,
    pub params: Map<String, Value>,
    pub headers: IndexMap<String, String>,
}

/// In-process transport: serves fixed documents by url and records posts.
#[derive(Debug, Default)]
pub struct StaticTransport {
    documents: IndexMap<String, Value>,
    post_reply: RefCell<Response>,
    posted: RefCell<Vec<PostedRequest>>,
    gets: RefCell<usize>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self {
            post_reply: RefCell::new(Response::ok(None)),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, url: impl Into<String>, data: Value) -> Self {
        self.documents.insert(url.into(), data);
        self
    }

    /// Reply returned by every subsequent `post`.
    pub fn reply_to_posts(&self, response: Response) {
        *self.post_reply.borrow_mut() = response;
    }

    pub fn posted(&self) -> Vec<PostedRequest> {
        self.posted.borrow().clone()
    }

    pub fn get_count(&self) -> usize {
        *self.gets.borrow()
    }
}

impl Transport for StaticTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        _params: &'a Map<String, Value>,
    ) -> LocalBoxFuture<'a, Result<Response>> {
        *self.gets.borrow_mut() += 1;
        let reply = self
            .documents
            .get(url)
            .cloned()
            .map(|data| Response::ok(Some(data)))
            .ok_or_else(|| anyhow!("no document served at '{url}'"));
        Box::pin(future::ready(reply))
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        data: &'a Value,
        params: &'a Map<String, Value>,
        options: &'a PostOptions,
    ) -> LocalBoxFuture<'a, Result<Response>> {
        self.posted.borrow_mut().push(PostedRequest {
            url: url.to_string(),
            data: data.clone(),
            params: params.clone(),
            headers: options.headers.clone(),
        });
        Box::pin(future::ready(Ok(self.post_reply.borrow().clone())))
    }
}
