use std::{future::Future, rc::Rc};

use anyhow::{Context, Result};
use futures::future::{self, LocalBoxFuture};
use jsonschema::Validator as JsonSchemaValidator;
use regex::Regex;
use serde_json::Value;

use super::tree::NodeId;

/// Cached outcome of the last validation run of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Validity {
    #[default]
    Valid,
    /// Invalid, optionally with a message to show.
    Invalid(Option<String>),
}

impl Validity {
    pub fn invalid(message: impl Into<String>) -> Self {
        Validity::Invalid(Some(message.into()))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(message) => message.as_deref(),
        }
    }
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        if valid {
            Validity::Valid
        } else {
            Validity::Invalid(None)
        }
    }
}

impl From<Result<(), String>> for Validity {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Validity::Valid,
            Err(message) => Validity::Invalid(Some(message)),
        }
    }
}

/// Identity of the field being validated, handed to validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    pub id: NodeId,
    pub name: String,
    pub label: Option<String>,
}

pub trait Validator {
    fn validate(&self, value: Value, field: FieldContext) -> LocalBoxFuture<'static, Validity>;
}

impl<F, Fut> Validator for F
where
    F: Fn(Value, FieldContext) -> Fut,
    Fut: Future<Output = Validity> + 'static,
{
    fn validate(&self, value: Value, field: FieldContext) -> LocalBoxFuture<'static, Validity> {
        Box::pin(self(value, field))
    }
}

impl std::fmt::Debug for dyn Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Validator")
    }
}

pub type SharedValidator = Rc<dyn Validator>;

/// Matches the stringified value against a regular expression.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
    message: String,
}

impl PatternValidator {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid pattern '{pattern}'"))?;
        Ok(Self {
            pattern,
            message: message.into(),
        })
    }
}

impl Validator for PatternValidator {
    fn validate(&self, value: Value, _field: FieldContext) -> LocalBoxFuture<'static, Validity> {
        let text = match &value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let outcome = if text.is_empty() || self.pattern.is_match(&text) {
            Validity::Valid
        } else {
            Validity::invalid(self.message.clone())
        };
        Box::pin(future::ready(outcome))
    }
}

/// Validates the field value against a JSON Schema.
///
/// The first schema error becomes the message unless an explicit one is set.
pub struct SchemaValidator {
    validator: JsonSchemaValidator,
    message: Option<String>,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    pub fn new(schema: &Value, message: Option<String>) -> Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|err| anyhow::anyhow!("invalid field schema: {err}"))?;
        Ok(Self { validator, message })
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, value: Value, _field: FieldContext) -> LocalBoxFuture<'static, Validity> {
        let outcome = match self.validator.iter_errors(&value).next() {
            None => Validity::Valid,
            Some(error) => Validity::invalid(
                self.message
                    .clone()
                    .unwrap_or_else(|| error.to_string()),
            ),
        };
        Box::pin(future::ready(outcome))
    }
}

/// Runs validators in order and reports the first failure.
#[derive(Debug, Default, Clone)]
pub struct ValidatorChain {
    validators: Vec<SharedValidator>,
}

impl ValidatorChain {
    pub fn new(validators: Vec<SharedValidator>) -> Self {
        Self { validators }
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Validator for ValidatorChain {
    fn validate(&self, value: Value, field: FieldContext) -> LocalBoxFuture<'static, Validity> {
        let validators = self.validators.clone();
        Box::pin(async move {
            for validator in validators {
                let outcome = validator.validate(value.clone(), field.clone()).await;
                if !outcome.is_valid() {
                    return outcome;
                }
            }
            Validity::Valid
        })
    }
}
