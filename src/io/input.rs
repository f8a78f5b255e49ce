use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::domain::FormDefinition;

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).context("failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).context("failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::from_str::<toml::Table>(contents)
            .context("failed to parse TOML document")
            .and_then(|table| {
                serde_json::to_value(table).context("failed to convert TOML to JSON")
            }),
    }
}

/// Tries `preferred` first, then every other compiled-in format.
pub fn parse_document_any(contents: &str, preferred: DocumentFormat) -> Result<Value> {
    let primary = match parse_document_str(contents, preferred) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for candidate in DocumentFormat::available_formats() {
        if candidate == preferred {
            continue;
        }
        if let Ok(value) = parse_document_str(contents, candidate) {
            return Ok(value);
        }
    }
    let tried = DocumentFormat::available_formats()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(anyhow!("tried {tried} (first error: {primary:#})"))
}

/// Decodes a form definition from an already parsed document.
pub fn parse_form_definition(document: Value) -> Result<FormDefinition> {
    serde_json::from_value(document).context("document is not a valid form definition")
}

/// Reads a form definition from a file, picking the format by extension.
pub fn load_definition(path: &Path) -> Result<FormDefinition> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read form definition {}", path.display()))?;
    let format = DocumentFormat::from_path(path).unwrap_or_default();
    let document = parse_document_any(&contents, format)
        .with_context(|| format!("failed to parse form definition {}", path.display()))?;
    parse_form_definition(document)
}
