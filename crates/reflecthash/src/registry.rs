//! JSON schema documents and the descriptor registry built from them.
//!
//! A schema document declares one package of enums and messages:
//!
//! ```json
//! {
//!   "package": "shop.v1",
//!   "enums": [{ "name": "Size", "values": [{ "name": "SMALL", "number": 0 }] }],
//!   "messages": [{
//!     "name": "Item",
//!     "fields": [
//!       { "name": "sku", "number": 1, "kind": "string" },
//!       { "name": "size", "number": 2, "kind": "enum", "type": "Size" },
//!       { "name": "tags", "number": 3, "kind": "string", "label": "repeated" },
//!       { "name": "stock", "number": 4, "map": { "key": "string", "value": "int64" } }
//!     ]
//!   }]
//! }
//! ```
//!
//! Type references resolve against the enclosing package first, then its parents; a
//! leading `.` makes a reference absolute.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;

use crate::decode;
use crate::dynamic::DynamicMessage;
use crate::schema::{
    Cardinality, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor,
};

/// Largest legal field number.
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// One schema document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Dotted package prefix for every declared type. May be empty.
    #[serde(default)]
    pub package: String,
    /// Enum types.
    #[serde(default)]
    pub enums: Vec<EnumSchema>,
    /// Message types.
    #[serde(default)]
    pub messages: Vec<MessageSchema>,
}

/// Declared enum type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumSchema {
    /// Simple name.
    pub name: String,
    /// Values in declaration order.
    pub values: Vec<EnumValueSchema>,
}

/// One named enum value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumValueSchema {
    /// Value name.
    pub name: String,
    /// Value number.
    pub number: i32,
}

/// Declared message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageSchema {
    /// Simple name.
    pub name: String,
    /// Fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// Declared field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    /// Field name.
    pub name: String,
    /// Field number.
    pub number: u32,
    /// Value kind. Required unless `map` is given.
    #[serde(default)]
    pub kind: Option<Kind>,
    /// Cardinality; `optional` when omitted.
    #[serde(default)]
    pub label: Cardinality,
    /// Referenced message or enum type.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    /// Declared default of a singular scalar field.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Name of the containing oneof.
    #[serde(default)]
    pub oneof: Option<String>,
    /// Key and value kinds when this field is a map.
    #[serde(default)]
    pub map: Option<MapSchema>,
}

/// Key and value declaration of a map field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapSchema {
    /// Key kind: an integer kind, `bool`, or `string`.
    pub key: Kind,
    /// Value kind.
    pub value: Kind,
    /// Referenced message or enum type of the value.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

/// Error raised while loading a schema document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Document is not valid JSON or does not match the document shape.
    #[error("invalid schema document: {0}")]
    Parse(#[from] serde_json::Error),
    /// Document could not be read.
    #[error("reading {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// An identifier is malformed.
    #[error("invalid identifier '{0}'")]
    InvalidName(String),
    /// A type name is declared twice.
    #[error("type {0} is declared more than once")]
    DuplicateType(String),
    /// A field or enum value name is declared twice.
    #[error("{scope} declares '{name}' more than once")]
    DuplicateName {
        /// Message or enum type.
        scope: String,
        /// Repeated name.
        name: String,
    },
    /// A field number is outside `1..=MAX_FIELD_NUMBER`.
    #[error("field {message}.{field} has invalid number {number}")]
    InvalidNumber {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
        /// Offending number.
        number: u32,
    },
    /// A field number is used twice.
    #[error("{message} uses field number {number} more than once")]
    DuplicateNumber {
        /// Message type.
        message: String,
        /// Repeated number.
        number: u32,
    },
    /// A field declares neither a kind nor a map.
    #[error("field {message}.{field} has no kind")]
    MissingKind {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
    },
    /// A message or enum reference does not resolve.
    #[error("field {message}.{field} refers to unknown type '{type_name}'")]
    UnresolvedType {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
        /// Reference as written.
        type_name: String,
    },
    /// A `type` was given for a kind that takes none, or omitted where required.
    #[error("field {message}.{field}: kind {kind} {reason}")]
    InvalidTypeReference {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
        /// Declared kind.
        kind: Kind,
        /// What is wrong.
        reason: &'static str,
    },
    /// A map key kind is not integral, bool or string.
    #[error("field {message}.{field} cannot use {kind} map keys")]
    InvalidMapKey {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
        /// Declared key kind.
        kind: Kind,
    },
    /// A oneof member is repeated, required, or a map.
    #[error("field {message}.{field} cannot be a oneof member")]
    InvalidOneofMember {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
    },
    /// A declared default is illegal for the field.
    #[error("field {message}.{field} has invalid default: {reason}")]
    InvalidDefault {
        /// Message type.
        message: String,
        /// Field name.
        field: String,
        /// What is wrong.
        reason: String,
    },
}

/// Resolved message and enum descriptors, keyed by fully-qualified name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    messages: BTreeMap<String, Arc<MessageDescriptor>>,
    enums: BTreeMap<String, Arc<EnumDescriptor>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from one JSON schema document.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        registry.add_json_str(json)?;
        Ok(registry)
    }

    /// Reads and loads a schema document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Parses and adds one JSON schema document.
    pub fn add_json_str(&mut self, json: &str) -> Result<(), SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        self.add_file(file)
    }

    /// Adds one schema document. Nothing is added when any declaration is invalid.
    ///
    /// Types may refer to types of earlier documents and of the same document.
    pub fn add_file(&mut self, file: SchemaFile) -> Result<(), SchemaError> {
        if !file.package.is_empty() {
            for part in file.package.split('.') {
                check_name(part)?;
            }
        }
        let package = file.package.as_str();

        let mut enums = BTreeMap::new();
        for schema in &file.enums {
            check_name(&schema.name)?;
            let full_name = qualify(package, &schema.name);
            if self.is_declared(&full_name) || enums.contains_key(&full_name) {
                return Err(SchemaError::DuplicateType(full_name));
            }
            let mut seen = BTreeSet::new();
            for value in &schema.values {
                check_name(&value.name)?;
                if !seen.insert(value.name.as_str()) {
                    return Err(SchemaError::DuplicateName {
                        scope: full_name.clone(),
                        name: value.name.clone(),
                    });
                }
            }
            let values = schema
                .values
                .iter()
                .map(|v| (v.name.clone(), v.number))
                .collect();
            let descriptor = EnumDescriptor::new(full_name.clone(), values);
            enums.insert(full_name, Arc::new(descriptor));
        }

        let mut declared = BTreeSet::new();
        for schema in &file.messages {
            check_name(&schema.name)?;
            let full_name = qualify(package, &schema.name);
            if self.is_declared(&full_name)
                || enums.contains_key(&full_name)
                || !declared.insert(full_name.clone())
            {
                return Err(SchemaError::DuplicateType(full_name));
            }
        }

        let scope = Scope {
            registry: self,
            package,
            messages: &declared,
            enums: &enums,
        };
        let mut messages = BTreeMap::new();
        for schema in &file.messages {
            let full_name = qualify(package, &schema.name);
            let descriptor = scope.build_message(&full_name, schema)?;
            messages.insert(full_name, Arc::new(descriptor));
        }

        debug!(
            package = package,
            messages = messages.len(),
            enums = enums.len(),
            "loaded schema"
        );
        self.enums.extend(enums);
        self.messages.extend(messages);
        Ok(())
    }

    /// Descriptor of a message type.
    pub fn message(&self, full_name: &str) -> Option<&Arc<MessageDescriptor>> {
        self.messages.get(full_name.trim_start_matches('.'))
    }

    /// Descriptor of an enum type.
    pub fn enum_type(&self, full_name: &str) -> Option<&Arc<EnumDescriptor>> {
        self.enums.get(full_name.trim_start_matches('.'))
    }

    /// Empty message of the named type.
    pub fn new_message(&self, full_name: &str) -> Option<DynamicMessage> {
        self.message(full_name)
            .map(|descriptor| DynamicMessage::new(Arc::clone(descriptor)))
    }

    /// Fully-qualified names of all message types, sorted.
    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    fn is_declared(&self, full_name: &str) -> bool {
        self.messages.contains_key(full_name) || self.enums.contains_key(full_name)
    }
}

/// Name lookup while a document is being added.
struct Scope<'a> {
    registry: &'a Registry,
    package: &'a str,
    messages: &'a BTreeSet<String>,
    enums: &'a BTreeMap<String, Arc<EnumDescriptor>>,
}

impl Scope<'_> {
    fn candidates(&self, reference: &str) -> Vec<String> {
        if let Some(absolute) = reference.strip_prefix('.') {
            return vec![absolute.to_string()];
        }
        let mut out = Vec::new();
        let mut package = self.package;
        loop {
            out.push(qualify(package, reference));
            if package.is_empty() {
                break;
            }
            package = package.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
        out
    }

    fn resolve_message(&self, reference: &str) -> Option<String> {
        self.candidates(reference).into_iter().find(|name| {
            self.messages.contains(name) || self.registry.messages.contains_key(name)
        })
    }

    fn resolve_enum(&self, reference: &str) -> Option<Arc<EnumDescriptor>> {
        self.candidates(reference).into_iter().find_map(|name| {
            self.enums
                .get(&name)
                .or_else(|| self.registry.enums.get(&name))
                .cloned()
        })
    }

    fn build_message(
        &self,
        full_name: &str,
        schema: &MessageSchema,
    ) -> Result<MessageDescriptor, SchemaError> {
        let mut numbers = BTreeSet::new();
        let mut names = BTreeSet::new();
        let mut fields = Vec::with_capacity(schema.fields.len());
        let mut oneofs: Vec<(String, Vec<String>)> = Vec::new();

        for field in &schema.fields {
            check_name(&field.name)?;
            if !(1..=MAX_FIELD_NUMBER).contains(&field.number) {
                return Err(SchemaError::InvalidNumber {
                    message: full_name.to_string(),
                    field: field.name.clone(),
                    number: field.number,
                });
            }
            if !numbers.insert(field.number) {
                return Err(SchemaError::DuplicateNumber {
                    message: full_name.to_string(),
                    number: field.number,
                });
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    scope: full_name.to_string(),
                    name: field.name.clone(),
                });
            }

            let descriptor = self.build_field(full_name, field)?;
            if let Some(oneof) = &field.oneof {
                check_name(oneof)?;
                if descriptor.cardinality() != Cardinality::Optional || descriptor.is_map() {
                    return Err(SchemaError::InvalidOneofMember {
                        message: full_name.to_string(),
                        field: field.name.clone(),
                    });
                }
                match oneofs.iter_mut().find(|(name, _)| name == oneof) {
                    Some((_, members)) => members.push(field.name.clone()),
                    None => oneofs.push((oneof.clone(), vec![field.name.clone()])),
                }
            }
            fields.push(descriptor);
        }
        Ok(MessageDescriptor::new(full_name, fields, oneofs))
    }

    fn build_field(
        &self,
        message: &str,
        field: &FieldSchema,
    ) -> Result<FieldDescriptor, SchemaError> {
        if let Some(map) = &field.map {
            if !map.key.is_valid_map_key() {
                return Err(SchemaError::InvalidMapKey {
                    message: message.to_string(),
                    field: field.name.clone(),
                    kind: map.key,
                });
            }
            if field.default.is_some() {
                return Err(invalid_default(message, field, "map fields take no default"));
            }
            let (value, _) = self.attach_type(
                message,
                &field.name,
                FieldDescriptor::new("value", 2, map.value),
                map.type_name.as_deref(),
            )?;
            return Ok(FieldDescriptor::map(&field.name, field.number, map.key, value));
        }

        let kind = field.kind.ok_or_else(|| SchemaError::MissingKind {
            message: message.to_string(),
            field: field.name.clone(),
        })?;
        let descriptor = FieldDescriptor::new(&field.name, field.number, kind)
            .with_cardinality(field.label);
        let (descriptor, enum_type) =
            self.attach_type(message, &field.name, descriptor, field.type_name.as_deref())?;

        let Some(default) = &field.default else {
            return Ok(descriptor);
        };
        if field.label == Cardinality::Repeated || !kind.is_scalar() {
            return Err(invalid_default(
                message,
                field,
                "only singular scalar fields take defaults",
            ));
        }
        let value = decode::scalar_from_json(kind, enum_type.as_deref(), default)
            .map_err(|reason| invalid_default(message, field, reason))?;
        Ok(descriptor.with_default(value))
    }

    /// Resolves the type reference of message, group and enum kinds.
    fn attach_type(
        &self,
        message: &str,
        field: &str,
        descriptor: FieldDescriptor,
        reference: Option<&str>,
    ) -> Result<(FieldDescriptor, Option<Arc<EnumDescriptor>>), SchemaError> {
        let kind = descriptor.kind();
        let needs_type = matches!(kind, Kind::Message | Kind::Group | Kind::Enum);
        let reference = match (needs_type, reference) {
            (false, None) => return Ok((descriptor, None)),
            (true, Some(reference)) => reference,
            (needs, _) => {
                return Err(SchemaError::InvalidTypeReference {
                    message: message.to_string(),
                    field: field.to_string(),
                    kind,
                    reason: if needs {
                        "requires a type"
                    } else {
                        "takes no type"
                    },
                })
            }
        };
        let unresolved = || SchemaError::UnresolvedType {
            message: message.to_string(),
            field: field.to_string(),
            type_name: reference.to_string(),
        };
        if kind == Kind::Enum {
            let enum_type = self.resolve_enum(reference).ok_or_else(unresolved)?;
            let descriptor = descriptor.with_type_name(enum_type.full_name());
            Ok((descriptor, Some(enum_type)))
        } else {
            let full_name = self.resolve_message(reference).ok_or_else(unresolved)?;
            Ok((descriptor.with_type_name(full_name), None))
        }
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", package, name)
    }
}

fn check_name(name: &str) -> Result<(), SchemaError> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid regex"));
    if re.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

fn invalid_default(message: &str, field: &FieldSchema, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidDefault {
        message: message.to_string(),
        field: field.name.clone(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::ScalarValue;
    use serde_json::json;

    fn load(doc: serde_json::Value) -> Result<Registry, SchemaError> {
        Registry::from_json_str(&doc.to_string())
    }

    #[test]
    fn resolves_relative_and_absolute_references() {
        let registry = load(json!({
            "package": "a.b",
            "enums": [{ "name": "Color", "values": [{ "name": "RED", "number": 1 }] }],
            "messages": [
                { "name": "Outer", "fields": [
                    { "name": "inner", "number": 1, "kind": "message", "type": "Inner" },
                    { "name": "again", "number": 2, "kind": "message", "type": ".a.b.Inner" },
                    { "name": "color", "number": 3, "kind": "enum", "type": "Color", "default": "RED" }
                ]},
                { "name": "Inner" }
            ]
        }))
        .unwrap();

        let outer = registry.message("a.b.Outer").unwrap();
        assert_eq!(outer.field_by_name("inner").unwrap().type_name(), Some("a.b.Inner"));
        assert_eq!(outer.field_by_name("again").unwrap().type_name(), Some("a.b.Inner"));
        let color = outer.field_by_name("color").unwrap();
        assert_eq!(color.type_name(), Some("a.b.Color"));
        assert!(color.default_value().unwrap().scalar_eq(&ScalarValue::Int(1).as_value()));
        assert_eq!(registry.message_names().collect::<Vec<_>>(), vec!["a.b.Inner", "a.b.Outer"]);
    }

    #[test]
    fn later_documents_see_earlier_types() {
        let mut registry = load(json!({
            "package": "base",
            "messages": [{ "name": "Id", "fields": [{ "name": "v", "number": 1, "kind": "string" }] }]
        }))
        .unwrap();
        registry
            .add_json_str(
                &json!({
                    "package": "app",
                    "messages": [{ "name": "User", "fields": [
                        { "name": "id", "number": 1, "kind": "message", "type": "base.Id" }
                    ]}]
                })
                .to_string(),
            )
            .unwrap();
        assert!(registry.new_message("app.User").is_some());
    }

    #[test]
    fn rejects_bad_field_numbers() {
        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "a", "number": 0, "kind": "bool" }
        ]}]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidNumber { number: 0, .. }));

        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "a", "number": 1, "kind": "bool" },
            { "name": "b", "number": 1, "kind": "bool" }
        ]}]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateNumber { number: 1, .. }));
    }

    #[test]
    fn rejects_invalid_names_and_keys() {
        let err = load(json!({ "messages": [{ "name": "9Lives" }] })).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName(name) if name == "9Lives"));

        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "m", "number": 1, "map": { "key": "double", "value": "string" } }
        ]}]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMapKey { kind: Kind::Double, .. }));
    }

    #[test]
    fn rejects_unresolved_types() {
        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "x", "number": 1, "kind": "message", "type": "Missing" }
        ]}]}))
        .unwrap_err();
        assert_eq!(err.to_string(), "field M.x refers to unknown type 'Missing'");
    }

    #[test]
    fn rejects_defaults_on_repeated_fields() {
        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "x", "number": 1, "kind": "int32", "label": "repeated", "default": 3 }
        ]}]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));

        let err = load(json!({ "messages": [{ "name": "M", "fields": [
            { "name": "x", "number": 1, "kind": "int32", "default": 5000000000i64 }
        ]}]}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn failed_documents_leave_registry_unchanged() {
        let mut registry = Registry::new();
        let result = registry.add_json_str(
            &json!({ "messages": [
                { "name": "Good" },
                { "name": "Bad", "fields": [{ "name": "x", "number": 1 }] }
            ]})
            .to_string(),
        );
        assert!(matches!(result, Err(SchemaError::MissingKind { .. })));
        assert!(registry.message("Good").is_none());
    }
}
