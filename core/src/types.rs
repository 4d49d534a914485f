//! Parameter schema type definitions.
//!
//! This module defines the in-memory model of a pipeline parameter schema:
//! a JSON-Schema-like document whose top level holds scalar parameters and
//! named groups of scalar parameters. Keys the model does not interpret
//! (titles, descriptions, help text, `$schema`, ...) are kept in `extra`
//! maps so a document survives a load/save round trip.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

/// File name of the schema inside a pipeline directory.
pub const SCHEMA_FILE_NAME: &str = "nextflow_schema.json";

/// `$schema` URI written into synthesized documents.
pub const DRAFT7_SCHEMA_URI: &str = "http://json-schema.org/draft-07/schema";

/// Value type of a scalar parameter.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::ParamType;
///
/// assert_eq!(ParamType::parse("integer"), Some(ParamType::Integer));
/// assert_eq!(ParamType::Boolean.as_str(), "boolean");
/// assert_eq!(ParamType::parse("object"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text.
    String,
    /// Whole number.
    Integer,
    /// Floating-point number.
    Number,
    /// `true` / `false`.
    Boolean,
}

impl ParamType {
    /// Returns the JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Parses a JSON Schema type name; `None` for anything that is not a
    /// scalar parameter type.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// Key order of a node as it was read.
///
/// Saved nodes are written back in this order so an unchanged document
/// produces an unchanged file. Keys the node gains later follow the recorded
/// ones. Never part of equality.
#[derive(Debug, Clone, Default)]
struct KeyOrder(Vec<String>);

impl KeyOrder {
    fn of(map: &Map<String, Value>) -> Self {
        Self(map.keys().cloned().collect())
    }

    fn arrange(&self, fields: Vec<(String, Value)>) -> Map<String, Value> {
        let mut pending: IndexMap<String, Value> = fields.into_iter().collect();
        let mut out = Map::new();
        for key in &self.0 {
            if let Some(value) = pending.shift_remove(key) {
                out.insert(key.clone(), value);
            }
        }
        out.extend(pending);
        out
    }
}

impl PartialEq for KeyOrder {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// A single typed parameter.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::{ParamType, ScalarProperty};
///
/// let prop = ScalarProperty::new(ParamType::Integer).with_default(16);
/// assert_eq!(prop.default, Some(serde_json::json!(16)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ScalarProperty {
    /// Value type.
    pub param_type: ParamType,
    /// Uninterpreted keys (description, help text, enum, ...).
    pub extra: Map<String, Value>,
    /// Default value, if any. `Some(Value::Null)` is an explicit `null`.
    pub default: Option<Value>,
    key_order: KeyOrder,
}

impl ScalarProperty {
    /// Creates a property of the given type with no default.
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            extra: Map::new(),
            default: None,
            key_order: KeyOrder::default(),
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl TryFrom<Map<String, Value>> for ScalarProperty {
    type Error = SchemaError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let key_order = KeyOrder::of(&map);
        let param_type = match map.remove("type") {
            Some(Value::String(name)) => ParamType::parse(&name).ok_or_else(|| {
                SchemaError::structure(format!("unsupported parameter type `{name}`"))
            })?,
            Some(_) => return Err(SchemaError::structure("parameter `type` must be a string")),
            None => return Err(SchemaError::structure("parameter has no `type`")),
        };
        let default = map.remove("default");
        Ok(Self {
            param_type,
            extra: map,
            default,
            key_order,
        })
    }
}

impl From<ScalarProperty> for Map<String, Value> {
    fn from(prop: ScalarProperty) -> Self {
        let mut fields = vec![(
            "type".to_string(),
            Value::String(prop.param_type.as_str().to_string()),
        )];
        if let Some(default) = prop.default {
            fields.push(("default".to_string(), default));
        }
        fields.extend(prop.extra);
        prop.key_order.arrange(fields)
    }
}

/// A named group of scalar parameters.
///
/// Groups hold scalars only; a group inside a group cannot be represented.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::{GroupProperty, ParamType, ScalarProperty};
///
/// let group = GroupProperty::new()
///     .with_property("reads", ScalarProperty::new(ParamType::String))
///     .with_required("reads");
/// assert!(group.properties.contains_key("reads"));
/// assert_eq!(group.required, vec!["reads"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct GroupProperty {
    /// Uninterpreted keys (title, description, ...).
    pub extra: Map<String, Value>,
    /// Child parameters in declaration order.
    pub properties: IndexMap<String, ScalarProperty>,
    /// Required child keys. Omitted from the serialized form when empty.
    pub required: Vec<String>,
    key_order: KeyOrder,
}

impl GroupProperty {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a child parameter.
    pub fn with_property(mut self, key: &str, prop: ScalarProperty) -> Self {
        self.properties.insert(key.to_string(), prop);
        self
    }

    /// Marks a child as required.
    pub fn with_required(mut self, key: &str) -> Self {
        if !self.required.iter().any(|k| k == key) {
            self.required.push(key.to_string());
        }
        self
    }
}

impl TryFrom<Map<String, Value>> for GroupProperty {
    type Error = SchemaError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let key_order = KeyOrder::of(&map);
        if map.remove("type").as_ref().and_then(Value::as_str) != Some("object") {
            return Err(SchemaError::structure("group must have `type: object`"));
        }
        let properties: IndexMap<String, ScalarProperty> = match map.remove("properties") {
            None => IndexMap::new(),
            Some(Value::Object(children)) => children
                .into_iter()
                .map(|(key, child)| scalar_entry(&key, child).map(|prop| (key, prop)))
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(SchemaError::structure(
                    "group 'properties' must be an object",
                ));
            }
        };
        let required = take_required(&mut map)?;
        Ok(Self {
            extra: map,
            properties,
            required,
            key_order,
        })
    }
}

impl From<GroupProperty> for Map<String, Value> {
    fn from(group: GroupProperty) -> Self {
        let mut fields = vec![("type".to_string(), Value::String("object".to_string()))];
        fields.extend(group.extra);
        let children = group
            .properties
            .into_iter()
            .map(|(key, prop)| (key, Value::Object(prop.into())))
            .collect();
        fields.push(("properties".to_string(), Value::Object(children)));
        if !group.required.is_empty() {
            fields.push(("required".to_string(), required_value(group.required)));
        }
        group.key_order.arrange(fields)
    }
}

/// A top-level schema entry: either a parameter or a group of parameters.
///
/// An entry with `type: "object"` is a group; anything else is a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum PropertyNode {
    /// `type: "object"` entry holding child parameters.
    Group(GroupProperty),
    /// Plain parameter.
    Scalar(ScalarProperty),
}

impl PropertyNode {
    /// Returns the group, if this node is one.
    pub fn as_group(&self) -> Option<&GroupProperty> {
        match self {
            Self::Group(group) => Some(group),
            Self::Scalar(_) => None,
        }
    }
}

impl TryFrom<Map<String, Value>> for PropertyNode {
    type Error = SchemaError;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        if map.get("type").and_then(Value::as_str) == Some("object") {
            GroupProperty::try_from(map).map(Self::Group)
        } else {
            ScalarProperty::try_from(map).map(Self::Scalar)
        }
    }
}

impl From<PropertyNode> for Map<String, Value> {
    fn from(node: PropertyNode) -> Self {
        match node {
            PropertyNode::Group(group) => group.into(),
            PropertyNode::Scalar(prop) => prop.into(),
        }
    }
}

impl From<ScalarProperty> for PropertyNode {
    fn from(prop: ScalarProperty) -> Self {
        Self::Scalar(prop)
    }
}

impl From<GroupProperty> for PropertyNode {
    fn from(group: GroupProperty) -> Self {
        Self::Group(group)
    }
}

/// A grouped parameter schema document.
///
/// This is the primary type in the crate. Entries keep the order they were
/// read or inserted in, and a loaded document is written back with its keys
/// in their original order, so saved documents diff cleanly.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::*;
///
/// let mut doc = SchemaDocument::new();
/// doc.insert("outdir", ScalarProperty::new(ParamType::String).with_default("./results"));
/// doc.insert(
///     "input_options",
///     GroupProperty::new().with_property("reads", ScalarProperty::new(ParamType::String)),
/// );
///
/// assert!(doc.contains_param("outdir"));
/// assert!(doc.contains_param("reads"));
/// assert_eq!(doc.param_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SchemaDocument {
    /// Uninterpreted top-level keys (`$schema`, `$id`, `title`, ...).
    pub extra: Map<String, Value>,
    /// Top-level entries in declaration order.
    pub properties: IndexMap<String, PropertyNode>,
    /// Required top-level keys. Omitted from the serialized form when empty.
    pub required: Vec<String>,
    key_order: KeyOrder,
}

impl SchemaDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the skeleton document used when a pipeline has no schema yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipeline_schema_core::SchemaDocument;
    ///
    /// let doc = SchemaDocument::skeleton("nf-core/rnaseq", "RNA sequencing analysis");
    /// assert_eq!(doc.extra["title"], "nf-core/rnaseq pipeline parameters");
    /// assert!(doc.properties.is_empty());
    /// ```
    pub fn skeleton(name: &str, description: &str) -> Self {
        let mut extra = Map::new();
        extra.insert(
            "$schema".to_string(),
            Value::String(DRAFT7_SCHEMA_URI.to_string()),
        );
        extra.insert(
            "$id".to_string(),
            Value::String(format!(
                "https://raw.githubusercontent.com/{name}/master/{SCHEMA_FILE_NAME}"
            )),
        );
        extra.insert(
            "title".to_string(),
            Value::String(format!("{name} pipeline parameters")),
        );
        extra.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
        extra.insert("type".to_string(), Value::String("object".to_string()));
        Self {
            extra,
            ..Self::default()
        }
    }

    /// Inserts or replaces a top-level entry.
    pub fn insert(&mut self, key: &str, node: impl Into<PropertyNode>) {
        self.properties.insert(key.to_string(), node.into());
    }

    /// Marks a top-level key as required.
    pub fn mark_required(&mut self, key: &str) {
        if !self.required.iter().any(|k| k == key) {
            self.required.push(key.to_string());
        }
    }

    /// Returns `true` if `key` names a top-level entry or any group child.
    pub fn contains_param(&self, key: &str) -> bool {
        self.properties.contains_key(key)
            || self
                .groups()
                .any(|(_, group)| group.properties.contains_key(key))
    }

    /// Looks up a parameter by key, at the top level or inside a group.
    pub fn find_param(&self, key: &str) -> Option<&ScalarProperty> {
        if let Some(PropertyNode::Scalar(prop)) = self.properties.get(key) {
            return Some(prop);
        }
        self.groups()
            .find_map(|(_, group)| group.properties.get(key))
    }

    /// Iterates over top-level groups in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupProperty)> {
        self.properties
            .iter()
            .filter_map(|(key, node)| node.as_group().map(|g| (key.as_str(), g)))
    }

    /// Number of parameters, counting group children and excluding the
    /// groups themselves.
    pub fn param_count(&self) -> usize {
        self.properties
            .values()
            .map(|node| match node {
                PropertyNode::Scalar(_) => 1,
                PropertyNode::Group(group) => group.properties.len(),
            })
            .sum()
    }

    /// Builds a document from a raw JSON value without the full structural
    /// checks of [`validate_schema`](crate::validate_schema).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaStructure`] if the value does not fit the
    /// model.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::try_from(map),
            _ => Err(SchemaError::structure("schema must be a JSON object")),
        }
    }

    /// Converts the document into a raw JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.clone().into())
    }
}

impl TryFrom<Map<String, Value>> for SchemaDocument {
    type Error = SchemaError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self> {
        let key_order = KeyOrder::of(&map);
        let properties: IndexMap<String, PropertyNode> = match map.remove("properties") {
            None => IndexMap::new(),
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, entry)| property_entry(&key, entry).map(|node| (key, node)))
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(SchemaError::structure("'properties' must be an object"));
            }
        };
        let required = take_required(&mut map)?;
        Ok(Self {
            extra: map,
            properties,
            required,
            key_order,
        })
    }
}

impl From<SchemaDocument> for Map<String, Value> {
    fn from(doc: SchemaDocument) -> Self {
        let mut fields: Vec<(String, Value)> = doc.extra.into_iter().collect();
        let entries = doc
            .properties
            .into_iter()
            .map(|(key, node)| (key, Value::Object(node.into())))
            .collect();
        fields.push(("properties".to_string(), Value::Object(entries)));
        if !doc.required.is_empty() {
            fields.push(("required".to_string(), required_value(doc.required)));
        }
        doc.key_order.arrange(fields)
    }
}

fn property_entry(key: &str, entry: Value) -> Result<PropertyNode> {
    let Value::Object(map) = entry else {
        return Err(SchemaError::structure(format!(
            "property `{key}` must be an object"
        )));
    };
    PropertyNode::try_from(map).map_err(|err| in_property(key, err))
}

fn scalar_entry(key: &str, entry: Value) -> Result<ScalarProperty> {
    let Value::Object(map) = entry else {
        return Err(SchemaError::structure(format!(
            "property `{key}` must be an object"
        )));
    };
    ScalarProperty::try_from(map).map_err(|err| in_property(key, err))
}

fn in_property(key: &str, err: SchemaError) -> SchemaError {
    match err {
        SchemaError::SchemaStructure { message } => {
            SchemaError::structure(format!("property `{key}`: {message}"))
        }
        other => other,
    }
}

fn take_required(map: &mut Map<String, Value>) -> Result<Vec<String>> {
    match map.remove("required") {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|_| SchemaError::structure("'required' must be a list of keys")),
    }
}

fn required_value(keys: Vec<String>) -> Value {
    Value::Array(keys.into_iter().map(Value::String).collect())
}
