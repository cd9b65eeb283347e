//! The reflection interface the hasher consumes.
//!
//! Any message representation can be hashed by implementing [`ReflectMessage`]: it
//! exposes a descriptor, a presence check, and a borrowed [`Value`] per field.

use std::fmt;

use crate::schema::{FieldDescriptor, MessageDescriptor};
use crate::validation::{self, ValidationError};

/// Borrowed view of a field value.
#[derive(Clone)]
pub enum Value<'a> {
    /// Absent value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Any signed integer kind, and enum ordinals.
    Int(i64),
    /// Any unsigned integer kind.
    Uint(u64),
    /// Either float width, widened to `f64`.
    Float(f64),
    /// UTF-8 text.
    String(&'a str),
    /// Opaque bytes.
    Bytes(&'a [u8]),
    /// Nested message.
    Message(&'a dyn ReflectMessage),
    /// Elements of a repeated field, in order.
    List(Vec<Value<'a>>),
    /// Entries of a map field, in any order.
    Map(Vec<(Value<'a>, Value<'a>)>),
}

impl<'a> Value<'a> {
    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Compares two scalar values. Containers and messages never compare equal.
    ///
    /// Floats compare numerically, so `-0.0` equals `0.0`; any NaN equals any other NaN.
    pub fn scalar_eq(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            _ => false,
        }
    }

    /// Renders a map key for diagnostics: strings quoted, numbers and bools bare.
    pub fn render_key(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Uint(u) => u.to_string(),
            Value::String(s) => format!("{:?}", s),
            other => format!("<{}>", other.type_name()),
        }
    }

    /// True for an empty list or map.
    pub fn is_empty_container(&self) -> bool {
        match self {
            Value::List(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Uint(u) => write!(f, "Uint({})", u),
            Value::Float(x) => write!(f, "Float({:?})", x),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bytes(b) => write!(f, "Bytes({})", hex::encode(b)),
            Value::Message(m) => write!(f, "Message({})", m.descriptor().full_name()),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
        }
    }
}

/// Owned scalar, used for declared field defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
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
}

impl ScalarValue {
    /// Borrowed view.
    pub fn as_value(&self) -> Value<'_> {
        match self {
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Int(i) => Value::Int(*i),
            ScalarValue::Uint(u) => Value::Uint(*u),
            ScalarValue::Float(f) => Value::Float(*f),
            ScalarValue::String(s) => Value::String(s),
            ScalarValue::Bytes(b) => Value::Bytes(b),
        }
    }
}

/// Read access to a message, as needed for hashing.
pub trait ReflectMessage {
    /// Schema of this message.
    fn descriptor(&self) -> &MessageDescriptor;

    /// Whether `field` carries a value. Empty lists and maps report `false`.
    fn has(&self, field: &FieldDescriptor) -> bool;

    /// Current value of `field`, or its default when unset.
    fn get(&self, field: &FieldDescriptor) -> Value<'_>;

    /// Rejects structurally invalid messages before hashing.
    ///
    /// The default walks the message through [`has`](Self::has) and [`get`](Self::get):
    /// required fields, oneof exclusivity, integer widths, and value/kind agreement.
    fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_message(self)
    }
}
