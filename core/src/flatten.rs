//! Flattening of grouped schemas into a single parameter namespace.
//!
//! Pipelines receive parameters as one flat mapping, so validation of a
//! parameter set runs against a [`FlatNamespace`] derived from the grouped
//! [`SchemaDocument`]. The transform is one-directional; reconciliation
//! edits the grouped document directly.
//!
//! # Example
//!
//! ```
//! use pipeline_schema_core::*;
//!
//! let mut doc = SchemaDocument::new();
//! doc.insert("outdir", ScalarProperty::new(ParamType::String));
//! doc.insert(
//!     "input_options",
//!     GroupProperty::new()
//!         .with_property("reads", ScalarProperty::new(ParamType::String))
//!         .with_required("reads"),
//! );
//!
//! let flat = flatten(&doc).unwrap();
//! assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["outdir", "reads"]);
//! assert_eq!(flat.required, vec!["reads"]);
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::{PropertyNode, ScalarProperty, SchemaDocument};

/// A schema with every group lifted to the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNamespace {
    /// Top-level keys of the source document other than `properties` and
    /// `required`.
    pub extra: Map<String, Value>,
    /// All parameters in declaration order.
    pub properties: IndexMap<String, ScalarProperty>,
    /// Union of the top-level and group required keys.
    pub required: Vec<String>,
}

impl FlatNamespace {
    /// Iterates over parameter keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Returns the default of every parameter that declares one.
    pub fn defaults(&self) -> IndexMap<String, Value> {
        self.properties
            .iter()
            .filter_map(|(key, prop)| prop.default.clone().map(|d| (key.clone(), d)))
            .collect()
    }

    /// Renders the namespace as a standalone JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut schema = self.extra.clone();
        schema
            .entry("type")
            .or_insert_with(|| Value::String("object".to_string()));
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(key, prop)| (key.clone(), Value::Object(prop.clone().into())))
            .collect();
        schema.insert("properties".to_string(), Value::Object(properties));
        if !self.required.is_empty() {
            schema.insert(
                "required".to_string(),
                Value::Array(self.required.iter().cloned().map(Value::String).collect()),
            );
        }
        Value::Object(schema)
    }
}

/// Flattens a grouped document.
///
/// Scalars are copied as-is; each group's children are lifted to the top
/// level and its required keys merged into the flat required list. The
/// document itself is never modified.
///
/// # Errors
///
/// Returns [`SchemaError::DuplicateParameter`] if a group child collides
/// with any top-level key (a parameter or a group name, its own included)
/// or with a child of an earlier group.
///
/// ```
/// use pipeline_schema_core::*;
///
/// let mut doc = SchemaDocument::new();
/// doc.insert("name", ScalarProperty::new(ParamType::String));
/// doc.insert(
///     "group",
///     GroupProperty::new().with_property("name", ScalarProperty::new(ParamType::String)),
/// );
/// assert_eq!(
///     flatten(&doc),
///     Err(SchemaError::DuplicateParameter { key: "name".into() })
/// );
/// ```
pub fn flatten(doc: &SchemaDocument) -> Result<FlatNamespace> {
    // Every top-level key, group names included, is taken before any child
    // is lifted.
    let mut claimed: HashSet<&str> = doc.properties.keys().map(String::as_str).collect();
    let mut properties: IndexMap<String, ScalarProperty> = IndexMap::new();
    let mut required: Vec<String> = Vec::new();
    push_unique(&mut required, &doc.required);

    for (key, node) in &doc.properties {
        match node {
            PropertyNode::Scalar(prop) => {
                properties.insert(key.clone(), prop.clone());
            }
            PropertyNode::Group(group) => {
                for (child_key, child) in &group.properties {
                    if !claimed.insert(child_key) {
                        return Err(SchemaError::DuplicateParameter {
                            key: child_key.clone(),
                        });
                    }
                    properties.insert(child_key.clone(), child.clone());
                }
                push_unique(&mut required, &group.required);
            }
        }
    }

    Ok(FlatNamespace {
        extra: doc.extra.clone(),
        properties,
        required,
    })
}

fn push_unique(target: &mut Vec<String>, keys: &[String]) {
    for key in keys {
        if !target.contains(key) {
            target.push(key.clone());
        }
    }
}
