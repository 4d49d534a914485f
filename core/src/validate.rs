//! Schema and parameter validation.
//!
//! Validates that a raw JSON document is a Draft 7 JSON Schema shaped like a
//! grouped parameter schema, and that a user-supplied parameter set
//! satisfies the flattened schema.
//!
//! # Examples
//!
//! ```
//! use pipeline_schema_core::*;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "type": "object",
//!     "properties": {
//!         "input_options": {
//!             "type": "object",
//!             "properties": {"reads": {"type": "string"}},
//!             "required": ["reads"]
//!         },
//!         "max_cpus": {"type": "integer", "default": 16}
//!     }
//! });
//! let doc = validate_schema(&raw).unwrap();
//! let flat = flatten(&doc).unwrap();
//!
//! let params = json!({"reads": "*.fq", "max_cpus": 4});
//! assert!(validate_instance(&flat, params.as_object().unwrap()).is_ok());
//!
//! let params = json!({"max_cpus": 4});
//! assert!(matches!(
//!     validate_instance(&flat, params.as_object().unwrap()),
//!     Err(SchemaError::InvalidParameters { .. })
//! ));
//! ```

use indexmap::IndexMap;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::{FlatNamespace, ParamType, SchemaDocument, flatten};

/// Outcome of linting a schema document.
#[derive(Debug, Clone)]
pub struct LintReport {
    /// The typed grouped document.
    pub document: SchemaDocument,
    /// Its flattened namespace.
    pub flat: FlatNamespace,
    /// Defaults declared by the flattened parameters.
    pub defaults: IndexMap<String, Value>,
}

/// Validates a raw schema document and returns its typed form.
///
/// The document must be a valid Draft 7 JSON Schema with a `properties`
/// object, every property must carry a supported `type`, groups may only
/// hold scalars, and every `required` entry must name an existing property.
///
/// # Errors
///
/// Returns [`SchemaError::SchemaStructure`] describing the first problem.
pub fn validate_schema(raw: &Value) -> Result<SchemaDocument> {
    check_structure(raw)?;
    SchemaDocument::from_value(raw.clone())
}

/// Lints a raw schema: validates it, flattens it, and validates the
/// flattened form.
///
/// # Errors
///
/// Returns [`SchemaError::SchemaStructure`] for structural problems in
/// either form and [`SchemaError::DuplicateParameter`] if flattening fails.
pub fn lint(raw: &Value) -> Result<LintReport> {
    let document = validate_schema(raw)?;
    let flat = flatten(&document)?;
    check_structure(&flat.to_json_schema()).map_err(|err| match err {
        SchemaError::SchemaStructure { message } => {
            SchemaError::structure(format!("flattened schema: {message}"))
        }
        other => other,
    })?;
    let defaults = flat.defaults();
    debug!(
        params = flat.properties.len(),
        defaults = defaults.len(),
        "schema linted"
    );
    Ok(LintReport {
        document,
        flat,
        defaults,
    })
}

/// Validates a parameter set against a flattened schema.
///
/// Only the first violation is reported.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidParameters`] if the parameters violate the
/// schema, or [`SchemaError::SchemaStructure`] if the flattened schema
/// cannot be compiled.
pub fn validate_instance(flat: &FlatNamespace, params: &Map<String, Value>) -> Result<()> {
    let schema = flat.to_json_schema();
    let compiled = compile_draft7(&schema)?;
    let instance = Value::Object(params.clone());

    match compiled.validate(&instance) {
        Ok(()) => Ok(()),
        Err(mut errors) => {
            let message = errors
                .next()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown validation failure".to_string());
            Err(SchemaError::InvalidParameters { message })
        }
    }
}

/// Parses a parameter file body, trying JSON first and YAML second.
///
/// # Errors
///
/// Returns [`SchemaError::ParameterFileParse`] with both parser messages if
/// neither format yields a mapping.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::parse_parameter_instance;
///
/// let params = parse_parameter_instance("reads: '*.fq'\nmax_cpus: 4\n").unwrap();
/// assert_eq!(params["max_cpus"], 4);
/// ```
pub fn parse_parameter_instance(text: &str) -> Result<Map<String, Value>> {
    let json = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => not_a_mapping(&other),
        Err(err) => err.to_string(),
    };
    debug!("Could not load input params as JSON: {json}");

    let yaml = match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => not_a_mapping(&other),
        Err(err) => err.to_string(),
    };
    Err(SchemaError::ParameterFileParse { json, yaml })
}

fn not_a_mapping(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    };
    format!("expected a mapping of parameters, found {kind}")
}

fn compile_draft7(schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map_err(|err| {
            SchemaError::structure(format!(
                "schema does not validate as Draft 7 JSON Schema: {err}"
            ))
        })
}

fn check_structure(raw: &Value) -> Result<()> {
    compile_draft7(raw)?;
    debug!("JSON Schema Draft 7 validated");

    let root = raw
        .as_object()
        .ok_or_else(|| SchemaError::structure("schema must be a JSON object"))?;
    let properties = root
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| SchemaError::structure("schema should have a 'properties' section"))?;

    for (key, node) in properties {
        check_property(key, node, None)?;
    }
    check_required(root.get("required"), properties, None)
}

fn check_property(key: &str, node: &Value, group: Option<&str>) -> Result<()> {
    let Some(node) = node.as_object() else {
        return Err(SchemaError::structure(format!(
            "property `{key}` must be an object"
        )));
    };
    let Some(type_name) = node.get("type").and_then(Value::as_str) else {
        return Err(SchemaError::structure(format!(
            "property `{key}` must declare a `type`"
        )));
    };

    if type_name == "object" {
        if let Some(group) = group {
            return Err(SchemaError::structure(format!(
                "group `{group}` nests group `{key}`: only one level of grouping is supported"
            )));
        }
        let children = match node.get("properties") {
            None => return check_required(node.get("required"), &Map::new(), Some(key)),
            Some(Value::Object(children)) => children,
            Some(_) => {
                return Err(SchemaError::structure(format!(
                    "group `{key}` must have a 'properties' object"
                )));
            }
        };
        for (child_key, child) in children {
            check_property(child_key, child, Some(key))?;
        }
        return check_required(node.get("required"), children, Some(key));
    }

    if ParamType::parse(type_name).is_none() {
        return Err(SchemaError::structure(format!(
            "property `{key}` has unsupported type `{type_name}`"
        )));
    }
    Ok(())
}

fn check_required(
    required: Option<&Value>,
    properties: &Map<String, Value>,
    group: Option<&str>,
) -> Result<()> {
    let Some(required) = required else {
        return Ok(());
    };
    let Some(keys) = required.as_array() else {
        return Err(SchemaError::structure("'required' must be a list of keys"));
    };
    for key in keys {
        let Some(key) = key.as_str() else {
            return Err(SchemaError::structure("'required' must be a list of keys"));
        };
        if !properties.contains_key(key) {
            let scope = group
                .map(|g| format!(" of group `{g}`"))
                .unwrap_or_default();
            return Err(SchemaError::structure(format!(
                "required parameter `{key}`{scope} is not defined in properties"
            )));
        }
    }
    Ok(())
}
