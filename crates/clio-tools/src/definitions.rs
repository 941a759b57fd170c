// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Tool definition documents shipped inside the binary.
//!
//! Each document uses the chat-completions tool layout
//! (`{"type": "function", "function": {name, description, parameters}}`).
use serde::Deserialize;
use thiserror::Error;

use clio_model::ToolDefinition;

/// `(source name, document text)` for every built-in tool, in advertised order.
const BUILTIN_DOCUMENTS: &[(&str, &str)] = &[
    ("read.json", include_str!("../definitions/read.json")),
    ("write.json", include_str!("../definitions/write.json")),
    ("bash.json", include_str!("../definitions/bash.json")),
];

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("tool definition {source_name} is not valid JSON: {source}")]
    Malformed {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool definition {source_name} has an empty name")]
    EmptyName { source_name: String },
    #[error("tool definition {name} must declare an object parameter schema")]
    BadSchema { name: String },
}

#[derive(Deserialize)]
struct Document {
    function: FunctionDoc,
}

#[derive(Deserialize)]
struct FunctionDoc {
    name: String,
    #[serde(default)]
    description: String,
    parameters: serde_json::Value,
}

/// Parse one definition document.
pub fn parse_definition(source_name: &str, text: &str) -> Result<ToolDefinition, DefinitionError> {
    let doc: Document = serde_json::from_str(text).map_err(|source| DefinitionError::Malformed {
        source_name: source_name.to_string(),
        source,
    })?;
    let f = doc.function;
    if f.name.trim().is_empty() {
        return Err(DefinitionError::EmptyName { source_name: source_name.to_string() });
    }
    let is_object_schema = f.parameters.get("type").and_then(|t| t.as_str()) == Some("object");
    if !is_object_schema {
        return Err(DefinitionError::BadSchema { name: f.name });
    }
    Ok(ToolDefinition { name: f.name, description: f.description, parameters: f.parameters })
}

/// Parse every built-in definition document.
pub fn load_definitions() -> Result<Vec<ToolDefinition>, DefinitionError> {
    BUILTIN_DOCUMENTS
        .iter()
        .map(|(source, text)| parse_definition(source, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_documents_load_in_order() {
        let defs = load_definitions().unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Read", "Write", "Bash"]);
        assert!(defs.iter().all(|d| !d.description.is_empty()));
    }

    #[test]
    fn builtin_schemas_declare_required_fields() {
        let defs = load_definitions().unwrap();
        let write = defs.iter().find(|d| d.name == "Write").unwrap();
        let required = write.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = parse_definition("broken.json", "{ \"function\": ").unwrap_err();
        assert!(matches!(err, DefinitionError::Malformed { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn missing_function_block_is_rejected() {
        let err = parse_definition("x.json", r#"{"type":"function"}"#).unwrap_err();
        assert!(matches!(err, DefinitionError::Malformed { .. }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let doc = r#"{"function":{"name":" ","parameters":{"type":"object"}}}"#;
        assert!(matches!(
            parse_definition("x.json", doc),
            Err(DefinitionError::EmptyName { .. })
        ));
    }

    #[test]
    fn non_object_schema_is_rejected() {
        let doc = r#"{"function":{"name":"Odd","parameters":{"type":"string"}}}"#;
        assert!(matches!(
            parse_definition("x.json", doc),
            Err(DefinitionError::BadSchema { .. })
        ));
    }
}
