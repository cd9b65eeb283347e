//! Schema-driven message values.
//!
//! [`DynamicMessage`] stores field values keyed by number against a shared
//! [`MessageDescriptor`] and implements [`ReflectMessage`], so any schema loaded at
//! runtime can be populated and hashed without generated code.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::path::FieldPath;
use crate::reflect::{ReflectMessage, ScalarValue, Value};
use crate::schema::{FieldDescriptor, Kind, MessageDescriptor};
use crate::validation::ValidationError;

/// Owned field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// Signed integer or enum ordinal.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Float of either width.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Nested message.
    Message(DynamicMessage),
    /// Repeated field elements.
    List(Vec<FieldValue>),
    /// Map entries, unique by key.
    Map(Vec<(FieldValue, FieldValue)>),
}

impl FieldValue {
    /// Builds a list value from anything convertible.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<FieldValue>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldValue>,
        V: Into<FieldValue>,
    {
        FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Uint(_) => "uint",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Message(_) => "message",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }

    /// Borrowed view for the reflection layer.
    pub fn as_value(&self) -> Value<'_> {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Int(*i),
            FieldValue::Uint(u) => Value::Uint(*u),
            FieldValue::Float(f) => Value::Float(*f),
            FieldValue::String(s) => Value::String(s),
            FieldValue::Bytes(b) => Value::Bytes(b),
            FieldValue::Message(m) => Value::Message(m),
            FieldValue::List(items) => Value::List(items.iter().map(FieldValue::as_value).collect()),
            FieldValue::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_value(), v.as_value()))
                    .collect(),
            ),
        }
    }

    fn is_empty_container(&self) -> bool {
        match self {
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Uint(u64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Uint(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        FieldValue::Float(f64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        FieldValue::Bytes(value.to_vec())
    }
}

impl From<DynamicMessage> for FieldValue {
    fn from(value: DynamicMessage) -> Self {
        FieldValue::Message(value)
    }
}

impl From<ScalarValue> for FieldValue {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(b) => FieldValue::Bool(b),
            ScalarValue::Int(i) => FieldValue::Int(i),
            ScalarValue::Uint(u) => FieldValue::Uint(u),
            ScalarValue::Float(f) => FieldValue::Float(f),
            ScalarValue::String(s) => FieldValue::String(s),
            ScalarValue::Bytes(b) => FieldValue::Bytes(b),
        }
    }
}

/// A message whose shape is given by a runtime descriptor.
///
/// Setters check every value against the declared kind, so a populated message only
/// holds values the hasher can encode. Setting one member of a oneof clears the others.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    values: BTreeMap<u32, FieldValue>,
}

impl DynamicMessage {
    /// Creates an empty message.
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            values: BTreeMap::new(),
        }
    }

    /// Shared descriptor handle.
    pub fn descriptor_arc(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Sets a field by name.
    ///
    /// # Errors
    ///
    /// Fails when the field does not exist or the value does not fit its kind.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, ValidationError> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = lookup(&descriptor, name)?;
        self.store(field, value.into())?;
        Ok(self)
    }

    /// Sets a field by number.
    pub fn set_number(
        &mut self,
        number: u32,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, ValidationError> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = descriptor
            .field_by_number(number)
            .ok_or_else(|| ValidationError::UnknownField {
                message: descriptor.full_name().to_string(),
                field: number.to_string(),
            })?;
        self.store(field, value.into())?;
        Ok(self)
    }

    /// Appends one element to a repeated field.
    pub fn push(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, ValidationError> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = lookup(&descriptor, name)?;
        let path = FieldPath::root().push_field(field.name());
        let value = value.into();
        if !field.is_list() {
            return Err(mismatch("list", &value, &path));
        }
        let element = coerce_single(field, value, &path)?;
        match self
            .values
            .entry(field.number())
            .or_insert_with(|| FieldValue::List(Vec::new()))
        {
            FieldValue::List(items) => items.push(element),
            other => *other = FieldValue::List(vec![element]),
        }
        Ok(self)
    }

    /// Inserts one map entry, replacing any entry with an equal key.
    pub fn insert(
        &mut self,
        name: &str,
        key: impl Into<FieldValue>,
        value: impl Into<FieldValue>,
    ) -> Result<&mut Self, ValidationError> {
        let descriptor = Arc::clone(&self.descriptor);
        let field = lookup(&descriptor, name)?;
        let path = FieldPath::root().push_field(field.name());
        let Some(entry) = field.map_entry() else {
            return Err(mismatch("map", &key.into(), &path));
        };
        let key = coerce_single(&entry.key, key.into(), &path)?;
        let value = coerce_single(&entry.value, value.into(), &path.push_key(&key.as_value().render_key()))?;
        match self
            .values
            .entry(field.number())
            .or_insert_with(|| FieldValue::Map(Vec::new()))
        {
            FieldValue::Map(entries) => upsert(entries, key, value),
            other => *other = FieldValue::Map(vec![(key, value)]),
        }
        Ok(self)
    }

    /// Unsets a field.
    pub fn clear(&mut self, name: &str) -> Result<&mut Self, ValidationError> {
        let number = lookup(&self.descriptor, name)?.number();
        self.values.remove(&number);
        Ok(self)
    }

    /// Stored value of a field, if set.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        let field = self.descriptor.field_by_name(name)?;
        self.values.get(&field.number())
    }

    fn store(&mut self, field: &FieldDescriptor, value: FieldValue) -> Result<(), ValidationError> {
        let path = FieldPath::root().push_field(field.name());
        let value = coerce(field, value, &path)?;
        if let Some(index) = field.oneof_index() {
            for sibling in self.descriptor.oneofs()[index].fields(&self.descriptor) {
                self.values.remove(&sibling.number());
            }
        }
        self.values.insert(field.number(), value);
        Ok(())
    }
}

impl ReflectMessage for DynamicMessage {
    fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    fn has(&self, field: &FieldDescriptor) -> bool {
        self.values
            .get(&field.number())
            .map_or(false, |v| !v.is_empty_container())
    }

    fn get(&self, field: &FieldDescriptor) -> Value<'_> {
        if let Some(value) = self.values.get(&field.number()) {
            return value.as_value();
        }
        if field.is_map() {
            return Value::Map(Vec::new());
        }
        if field.is_list() {
            return Value::List(Vec::new());
        }
        self.descriptor
            .field_by_number(field.number())
            .and_then(FieldDescriptor::default_value)
            .unwrap_or(Value::Nil)
    }
}

fn lookup<'d>(
    descriptor: &'d MessageDescriptor,
    name: &str,
) -> Result<&'d FieldDescriptor, ValidationError> {
    descriptor
        .field_by_name(name)
        .ok_or_else(|| ValidationError::UnknownField {
            message: descriptor.full_name().to_string(),
            field: name.to_string(),
        })
}

fn upsert(entries: &mut Vec<(FieldValue, FieldValue)>, key: FieldValue, value: FieldValue) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => entries.push((key, value)),
    }
}

fn coerce(
    field: &FieldDescriptor,
    value: FieldValue,
    path: &FieldPath,
) -> Result<FieldValue, ValidationError> {
    if let Some(entry) = field.map_entry() {
        let FieldValue::Map(raw) = value else {
            return Err(mismatch("map", &value, path));
        };
        let mut entries = Vec::with_capacity(raw.len());
        for (key, item) in raw {
            let key = coerce_single(&entry.key, key, path)?;
            let item_path = path.push_key(&key.as_value().render_key());
            let item = coerce_single(&entry.value, item, &item_path)?;
            upsert(&mut entries, key, item);
        }
        return Ok(FieldValue::Map(entries));
    }
    if field.is_list() {
        let FieldValue::List(raw) = value else {
            return Err(mismatch("list", &value, path));
        };
        return raw
            .into_iter()
            .enumerate()
            .map(|(index, item)| coerce_single(field, item, &path.push_index(index)))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::List);
    }
    coerce_single(field, value, path)
}

fn coerce_single(
    field: &FieldDescriptor,
    value: FieldValue,
    path: &FieldPath,
) -> Result<FieldValue, ValidationError> {
    let kind = field.kind();
    match (kind, value) {
        (Kind::Bool, v @ FieldValue::Bool(_)) => Ok(v),
        (k, FieldValue::Int(i)) if k.is_signed() => check_signed(k, i, path),
        (k, FieldValue::Uint(u)) if k.is_signed() => match i64::try_from(u) {
            Ok(i) => check_signed(k, i, path),
            Err(_) => Err(out_of_range(k, u, path)),
        },
        (k, FieldValue::Uint(u)) if k.is_unsigned() => check_unsigned(k, u, path),
        (k, FieldValue::Int(i)) if k.is_unsigned() => match u64::try_from(i) {
            Ok(u) => check_unsigned(k, u, path),
            Err(_) => Err(out_of_range(k, i, path)),
        },
        (Kind::Float, FieldValue::Float(f)) => {
            let narrowed = f as f32;
            if f.is_finite() && narrowed.is_infinite() {
                return Err(out_of_range(Kind::Float, f, path));
            }
            Ok(FieldValue::Float(f64::from(narrowed)))
        }
        (Kind::Double, v @ FieldValue::Float(_)) => Ok(v),
        (Kind::String, v @ FieldValue::String(_)) => Ok(v),
        (Kind::Bytes, v @ FieldValue::Bytes(_)) => Ok(v),
        (Kind::Message | Kind::Group, FieldValue::Message(m)) => {
            if let Some(expected) = field.type_name() {
                let found = m.descriptor().full_name();
                if found != expected {
                    return Err(ValidationError::TypeMismatch {
                        path: path.to_string(),
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
            }
            Ok(FieldValue::Message(m))
        }
        (k, other) => Err(mismatch(k.as_str(), &other, path)),
    }
}

fn check_signed(kind: Kind, value: i64, path: &FieldPath) -> Result<FieldValue, ValidationError> {
    if kind.is_32_bit() && i32::try_from(value).is_err() {
        return Err(out_of_range(kind, value, path));
    }
    Ok(FieldValue::Int(value))
}

fn check_unsigned(kind: Kind, value: u64, path: &FieldPath) -> Result<FieldValue, ValidationError> {
    if kind.is_32_bit() && u32::try_from(value).is_err() {
        return Err(out_of_range(kind, value, path));
    }
    Ok(FieldValue::Uint(value))
}

fn mismatch(expected: &str, found: &FieldValue, path: &FieldPath) -> ValidationError {
    ValidationError::KindMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.type_name(),
    }
}

fn out_of_range(kind: Kind, value: impl ToString, path: &FieldPath) -> ValidationError {
    ValidationError::OutOfRange {
        path: path.to_string(),
        kind,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> Arc<MessageDescriptor> {
        Arc::new(MessageDescriptor::new(
            "test.Dyn",
            vec![
                FieldDescriptor::new("small", 1, Kind::Int32),
                FieldDescriptor::new("unsigned", 2, Kind::Uint64),
                FieldDescriptor::new("ratio", 3, Kind::Float),
                FieldDescriptor::new("names", 4, Kind::String).repeated(),
                FieldDescriptor::map("lookup", 5, Kind::String, FieldDescriptor::new("", 0, Kind::Int64)),
                FieldDescriptor::new("text", 6, Kind::String),
                FieldDescriptor::new("flag", 7, Kind::Bool),
            ],
            vec![("choice".to_string(), vec!["text".into(), "flag".into()])],
        ))
    }

    #[test]
    fn rejects_values_outside_declared_width() {
        let mut msg = DynamicMessage::new(descriptor());
        let err = msg.set("small", i64::from(i32::MAX) + 1).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { kind: Kind::Int32, .. }));
        let err = msg.set("unsigned", -1i64).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(msg.set("ratio", 1e300).is_err());
    }

    #[test]
    fn converts_between_integer_signedness() {
        let mut msg = DynamicMessage::new(descriptor());
        msg.set("small", 7u32).unwrap().set("unsigned", 9i64).unwrap();
        assert_eq!(msg.value("small"), Some(&FieldValue::Int(7)));
        assert_eq!(msg.value("unsigned"), Some(&FieldValue::Uint(9)));
    }

    #[test]
    fn narrows_single_precision_floats() {
        let mut msg = DynamicMessage::new(descriptor());
        msg.set("ratio", 0.1f64).unwrap();
        assert_eq!(msg.value("ratio"), Some(&FieldValue::Float(f64::from(0.1f32))));
    }

    #[test]
    fn oneof_members_replace_each_other() {
        let mut msg = DynamicMessage::new(descriptor());
        msg.set("text", "hello").unwrap();
        msg.set("flag", true).unwrap();
        assert!(msg.value("text").is_none());
        assert_eq!(msg.value("flag"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn map_insert_replaces_equal_keys() {
        let mut msg = DynamicMessage::new(descriptor());
        msg.insert("lookup", "a", 1i64).unwrap();
        msg.insert("lookup", "a", 2i64).unwrap();
        assert_eq!(
            msg.value("lookup"),
            Some(&FieldValue::Map(vec![(FieldValue::from("a"), FieldValue::Int(2))]))
        );
    }

    #[test]
    fn empty_lists_are_not_present() {
        let mut msg = DynamicMessage::new(descriptor());
        msg.set("names", FieldValue::List(Vec::new())).unwrap();
        let field = msg.descriptor().field_by_name("names").unwrap().clone();
        assert!(!msg.has(&field));
        msg.push("names", "x").unwrap();
        assert!(msg.has(&field));
    }

    #[test]
    fn unset_scalars_read_as_defaults() {
        let msg = DynamicMessage::new(descriptor());
        let field = msg.descriptor().field_by_name("small").unwrap().clone();
        assert!(msg.get(&field).scalar_eq(&Value::Int(0)));
    }

    #[test]
    fn unknown_fields_are_reported() {
        let mut msg = DynamicMessage::new(descriptor());
        let err = msg.set("missing", 1).unwrap_err();
        assert_eq!(err.to_string(), "test.Dyn has no field missing");
    }
}
