use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reflect::{ScalarValue, Value};

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// `bool`
    Bool,
    /// Enum ordinal, hashed as a signed integer.
    Enum,
    /// `int32`
    Int32,
    /// `sint32`
    Sint32,
    /// `sfixed32`
    Sfixed32,
    /// `int64`
    Int64,
    /// `sint64`
    Sint64,
    /// `sfixed64`
    Sfixed64,
    /// `uint32`
    Uint32,
    /// `fixed32`
    Fixed32,
    /// `uint64`
    Uint64,
    /// `fixed64`
    Fixed64,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// UTF-8 text.
    String,
    /// Opaque bytes.
    Bytes,
    /// Nested message.
    Message,
    /// Legacy group encoding. Has no canonical form.
    Group,
}

impl Kind {
    /// Kinds carried as signed integers.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Kind::Enum
                | Kind::Int32
                | Kind::Sint32
                | Kind::Sfixed32
                | Kind::Int64
                | Kind::Sint64
                | Kind::Sfixed64
        )
    }

    /// Kinds carried as unsigned integers.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::Uint32 | Kind::Fixed32 | Kind::Uint64 | Kind::Fixed64
        )
    }

    /// Kinds with a 32-bit value range.
    pub fn is_32_bit(self) -> bool {
        matches!(
            self,
            Kind::Enum
                | Kind::Int32
                | Kind::Sint32
                | Kind::Sfixed32
                | Kind::Uint32
                | Kind::Fixed32
        )
    }

    /// Whether a map may be keyed by this kind.
    pub fn is_valid_map_key(self) -> bool {
        (self.is_signed() && self != Kind::Enum)
            || self.is_unsigned()
            || matches!(self, Kind::Bool | Kind::String)
    }

    /// Whether values of this kind are scalars (everything except messages and groups).
    pub fn is_scalar(self) -> bool {
        !matches!(self, Kind::Message | Kind::Group)
    }

    /// Schema-file spelling of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Enum => "enum",
            Kind::Int32 => "int32",
            Kind::Sint32 => "sint32",
            Kind::Sfixed32 => "sfixed32",
            Kind::Int64 => "int64",
            Kind::Sint64 => "sint64",
            Kind::Sfixed64 => "sfixed64",
            Kind::Uint32 => "uint32",
            Kind::Fixed32 => "fixed32",
            Kind::Uint64 => "uint64",
            Kind::Fixed64 => "fixed64",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Bytes => "bytes",
            Kind::Message => "message",
            Kind::Group => "group",
        }
    }

    /// Zero value of a scalar kind.
    pub fn zero_value(self) -> Option<Value<'static>> {
        let zero = match self {
            Kind::Bool => Value::Bool(false),
            Kind::Float | Kind::Double => Value::Float(0.0),
            Kind::String => Value::String(""),
            Kind::Bytes => Value::Bytes(&[]),
            Kind::Message | Kind::Group => return None,
            k if k.is_unsigned() => Value::Uint(0),
            _ => Value::Int(0),
        };
        Some(zero)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Zero or one value.
    #[default]
    Optional,
    /// Exactly one value; a message missing it fails validation.
    Required,
    /// A list, or a map when the field has a [`MapEntry`].
    Repeated,
}

/// Key and value descriptors of a map field.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    /// Descriptor of the key (number 1).
    pub key: FieldDescriptor,
    /// Descriptor of the value (number 2).
    pub value: FieldDescriptor,
}

/// Description of one field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) number: u32,
    pub(crate) kind: Kind,
    pub(crate) cardinality: Cardinality,
    pub(crate) type_name: Option<String>,
    pub(crate) default: Option<ScalarValue>,
    pub(crate) oneof: Option<usize>,
    pub(crate) map_entry: Option<Box<MapEntry>>,
}

impl FieldDescriptor {
    /// Creates a singular field.
    pub fn new(name: impl Into<String>, number: u32, kind: Kind) -> Self {
        Self {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Optional,
            type_name: None,
            default: None,
            oneof: None,
            map_entry: None,
        }
    }

    /// Creates a map field with the given key and value descriptors.
    pub fn map(name: impl Into<String>, number: u32, key: Kind, value: FieldDescriptor) -> Self {
        let mut value = value;
        value.name = "value".to_string();
        value.number = 2;
        value.cardinality = Cardinality::Optional;
        Self {
            cardinality: Cardinality::Repeated,
            map_entry: Some(Box::new(MapEntry {
                key: FieldDescriptor::new("key", 1, key),
                value,
            })),
            ..Self::new(name, number, Kind::Message)
        }
    }

    /// Sets the cardinality.
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Shorthand for `with_cardinality(Cardinality::Repeated)`.
    pub fn repeated(self) -> Self {
        self.with_cardinality(Cardinality::Repeated)
    }

    /// Names the message or enum type of this field.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Declares an explicit default for a scalar field.
    pub fn with_default(mut self, default: ScalarValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Declared kind. Map fields report [`Kind::Message`].
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Declared cardinality.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Fully-qualified message or enum type, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Index of the containing oneof in [`MessageDescriptor::oneofs`].
    pub fn oneof_index(&self) -> Option<usize> {
        self.oneof
    }

    /// True for repeated fields that are not maps.
    pub fn is_list(&self) -> bool {
        self.cardinality == Cardinality::Repeated && self.map_entry.is_none()
    }

    /// True for map fields.
    pub fn is_map(&self) -> bool {
        self.map_entry.is_some()
    }

    /// Key and value descriptors of a map field.
    pub fn map_entry(&self) -> Option<&MapEntry> {
        self.map_entry.as_deref()
    }

    /// True when a missing value must fail validation.
    pub fn is_required(&self) -> bool {
        self.cardinality == Cardinality::Required
    }

    /// Default of a singular scalar field: the declared default, else the kind's zero.
    ///
    /// Lists, maps, messages and groups have no comparable default.
    pub fn default_value(&self) -> Option<Value<'_>> {
        if self.cardinality == Cardinality::Repeated || !self.kind.is_scalar() {
            return None;
        }
        match &self.default {
            Some(default) => Some(default.as_value()),
            None => self.kind.zero_value(),
        }
    }
}

/// A mutually-exclusive field group.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    pub(crate) name: String,
    pub(crate) fields: Vec<usize>,
}

impl OneofDescriptor {
    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member fields, borrowed from the owning message descriptor.
    pub fn fields<'a>(
        &'a self,
        message: &'a MessageDescriptor,
    ) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        self.fields.iter().map(move |&i| &message.fields[i])
    }
}

/// Description of a message type.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    pub(crate) full_name: String,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) oneofs: Vec<OneofDescriptor>,
}

impl MessageDescriptor {
    /// Builds a descriptor; fields keep the declared order.
    ///
    /// `oneofs` pairs a group name with the names of its member fields. Unknown member
    /// names are ignored here; [`crate::Registry`] rejects them when loading schemas.
    /// A field belongs to at most one oneof: the first group that lists it.
    pub fn new(
        full_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        oneofs: Vec<(String, Vec<String>)>,
    ) -> Self {
        let mut fields = fields;
        let mut groups = Vec::with_capacity(oneofs.len());
        for (index, (name, members)) in oneofs.into_iter().enumerate() {
            let mut member_indexes = Vec::new();
            for (i, field) in fields.iter_mut().enumerate() {
                if field.oneof.is_none() && members.iter().any(|m| m == &field.name) {
                    field.oneof = Some(index);
                    member_indexes.push(i);
                }
            }
            groups.push(OneofDescriptor {
                name,
                fields: member_indexes,
            });
        }
        Self {
            full_name: full_name.into(),
            fields,
            oneofs: groups,
        }
    }

    /// Fully-qualified name, e.g. `test.v3.Simple`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// All fields, including oneof members.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields outside any oneof.
    pub fn ordinary_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.oneof.is_none())
    }

    /// Declared oneof groups.
    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    /// Looks up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field by number.
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// Description of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub(crate) full_name: String,
    pub(crate) values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    /// Builds an enum descriptor from `(name, number)` pairs.
    pub fn new(full_name: impl Into<String>, values: Vec<(String, i32)>) -> Self {
        Self {
            full_name: full_name.into(),
            values,
        }
    }

    /// Fully-qualified name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Number of a named value.
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Declared values in order.
    pub fn values(&self) -> &[(String, i32)] {
        &self.values
    }
}
