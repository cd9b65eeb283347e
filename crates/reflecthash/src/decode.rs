//! JSON decoding of messages against a [`Registry`].
//!
//! Accepts the usual JSON mapping of schema-typed messages: field names (or their
//! lowerCamelCase form) as keys, 64-bit integers as numbers or strings, floats as
//! numbers or `"NaN"`/`"Infinity"`/`"-Infinity"`, bytes as base64, enums as names or
//! numbers, and `null` for an unset field.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value as Json;
use thiserror::Error;
use tracing::trace;

use crate::dynamic::{DynamicMessage, FieldValue};
use crate::path::FieldPath;
use crate::reflect::ScalarValue;
use crate::registry::Registry;
use crate::schema::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor};
use crate::validation::ValidationError;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Error raised while decoding a JSON message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// The registry has no such message type.
    #[error("unknown message type {0}")]
    UnknownMessage(String),
    /// A message was not given as a JSON object.
    #[error("expected an object for {message} at {path}")]
    NotAnObject {
        /// Message type.
        message: String,
        /// Location of the value.
        path: String,
    },
    /// A key names no field of the message.
    #[error("{message} has no field '{field}' (at {path})")]
    UnknownField {
        /// Message type.
        message: String,
        /// Key as written.
        field: String,
        /// Location of the message.
        path: String,
    },
    /// A value does not fit its field.
    #[error("invalid value at {path}: {reason}")]
    InvalidValue {
        /// Location of the value.
        path: String,
        /// What is wrong.
        reason: String,
    },
    /// Two members of one oneof are given.
    #[error("oneof {oneof} at {path} is given more than once")]
    OneofConflict {
        /// Location of the message.
        path: String,
        /// Oneof name.
        oneof: String,
    },
    /// The decoded value was rejected by the message.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Registry {
    /// Decodes a JSON string into a message of type `type_name`.
    pub fn decode_json_str(&self, type_name: &str, json: &str) -> Result<DynamicMessage, DecodeError> {
        let value: Json = serde_json::from_str(json)?;
        self.decode_json(type_name, &value)
    }

    /// Decodes a JSON value into a message of type `type_name`.
    pub fn decode_json(&self, type_name: &str, json: &Json) -> Result<DynamicMessage, DecodeError> {
        let descriptor = self
            .message(type_name)
            .ok_or_else(|| DecodeError::UnknownMessage(type_name.to_string()))?;
        self.decode_message(Arc::clone(descriptor), json, &FieldPath::root())
    }

    fn decode_message(
        &self,
        descriptor: Arc<MessageDescriptor>,
        json: &Json,
        path: &FieldPath,
    ) -> Result<DynamicMessage, DecodeError> {
        let Some(object) = json.as_object() else {
            return Err(DecodeError::NotAnObject {
                message: descriptor.full_name().to_string(),
                path: path.to_string(),
            });
        };
        let mut message = DynamicMessage::new(Arc::clone(&descriptor));
        let mut oneofs_seen = BTreeSet::new();
        let mut fields_seen = BTreeSet::new();
        for (key, raw) in object {
            let field = find_field(&descriptor, key).ok_or_else(|| DecodeError::UnknownField {
                message: descriptor.full_name().to_string(),
                field: key.clone(),
                path: path.to_string(),
            })?;
            if !fields_seen.insert(field.number()) {
                return Err(invalid(
                    &path.push_field(field.name()),
                    "field is given more than once",
                ));
            }
            if raw.is_null() {
                continue;
            }
            if let Some(index) = field.oneof_index() {
                if !oneofs_seen.insert(index) {
                    return Err(DecodeError::OneofConflict {
                        path: path.to_string(),
                        oneof: descriptor.oneofs()[index].name().to_string(),
                    });
                }
            }
            let field_path = path.push_field(field.name());
            let value = self.decode_field(field, raw, &field_path)?;
            trace!(path = %field_path, "decoded field");
            message.set_number(field.number(), value)?;
        }
        Ok(message)
    }

    fn decode_field(
        &self,
        field: &FieldDescriptor,
        raw: &Json,
        path: &FieldPath,
    ) -> Result<FieldValue, DecodeError> {
        if let Some(entry) = field.map_entry() {
            let object = raw.as_object().ok_or_else(|| invalid(path, "expected an object"))?;
            let mut entries = Vec::with_capacity(object.len());
            for (key, item) in object {
                let key = map_key(entry.key.kind(), key).map_err(|reason| invalid(path, reason))?;
                let item_path = path.push_key(&key.as_value().render_key());
                entries.push((key, self.decode_single(&entry.value, item, &item_path)?));
            }
            return Ok(FieldValue::Map(entries));
        }
        if field.is_list() {
            let items = raw.as_array().ok_or_else(|| invalid(path, "expected an array"))?;
            return items
                .iter()
                .enumerate()
                .map(|(index, item)| self.decode_single(field, item, &path.push_index(index)))
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::List);
        }
        self.decode_single(field, raw, path)
    }

    fn decode_single(
        &self,
        field: &FieldDescriptor,
        raw: &Json,
        path: &FieldPath,
    ) -> Result<FieldValue, DecodeError> {
        match field.kind() {
            Kind::Message | Kind::Group => {
                let type_name = field.type_name().unwrap_or_default();
                let descriptor = self
                    .message(type_name)
                    .ok_or_else(|| DecodeError::UnknownMessage(type_name.to_string()))?;
                let nested = self.decode_message(Arc::clone(descriptor), raw, path)?;
                Ok(FieldValue::Message(nested))
            }
            kind => {
                let enum_type = match kind {
                    Kind::Enum => field.type_name().and_then(|name| self.enum_type(name)),
                    _ => None,
                };
                scalar_from_json(kind, enum_type.map(|e| &**e), raw)
                    .map(FieldValue::from)
                    .map_err(|reason| invalid(path, reason))
            }
        }
    }
}

fn find_field<'d>(descriptor: &'d MessageDescriptor, key: &str) -> Option<&'d FieldDescriptor> {
    descriptor
        .field_by_name(key)
        .or_else(|| descriptor.fields().iter().find(|f| camel_case(f.name()) == key))
}

/// `snake_case` to `lowerCamelCase`.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn invalid(path: &FieldPath, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidValue {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn map_key(kind: Kind, key: &str) -> Result<FieldValue, String> {
    let value = match kind {
        Kind::String => return Ok(FieldValue::String(key.to_string())),
        Kind::Bool => match key {
            "true" => ScalarValue::Bool(true),
            "false" => ScalarValue::Bool(false),
            _ => return Err(format!("'{}' is not a bool key", key)),
        },
        _ => scalar_from_json(kind, None, &Json::String(key.to_string()))?,
    };
    Ok(value.into())
}

/// Parses a JSON scalar as a value of `kind`, enforcing the kind's range.
///
/// Single-precision floats are narrowed. Returns a description of the problem on
/// failure.
pub(crate) fn scalar_from_json(
    kind: Kind,
    enum_type: Option<&EnumDescriptor>,
    json: &Json,
) -> Result<ScalarValue, String> {
    match kind {
        Kind::Bool => json
            .as_bool()
            .map(ScalarValue::Bool)
            .ok_or_else(|| format!("expected a bool, found {}", json)),
        Kind::Enum => {
            if let Some(name) = json.as_str() {
                let number = enum_type
                    .and_then(|e| e.number_of(name))
                    .ok_or_else(|| format!("unknown enum value '{}'", name))?;
                return Ok(ScalarValue::Int(i64::from(number)));
            }
            let number = parse_i64(json)?;
            i32::try_from(number)
                .map(|n| ScalarValue::Int(i64::from(n)))
                .map_err(|_| format!("{} is out of range for enum", number))
        }
        k if k.is_signed() => {
            let number = parse_i64(json)?;
            if k.is_32_bit() && i32::try_from(number).is_err() {
                return Err(format!("{} is out of range for {}", number, k));
            }
            Ok(ScalarValue::Int(number))
        }
        k if k.is_unsigned() => {
            let number = parse_u64(json)?;
            if k.is_32_bit() && u32::try_from(number).is_err() {
                return Err(format!("{} is out of range for {}", number, k));
            }
            Ok(ScalarValue::Uint(number))
        }
        Kind::Float | Kind::Double => {
            let number = parse_f64(json)?;
            if kind == Kind::Double {
                return Ok(ScalarValue::Float(number));
            }
            let narrowed = number as f32;
            if number.is_finite() && narrowed.is_infinite() {
                return Err(format!("{} is out of range for float", number));
            }
            Ok(ScalarValue::Float(f64::from(narrowed)))
        }
        Kind::String => json
            .as_str()
            .map(|s| ScalarValue::String(s.to_string()))
            .ok_or_else(|| format!("expected a string, found {}", json)),
        Kind::Bytes => {
            use base64::Engine;
            let text = json
                .as_str()
                .ok_or_else(|| format!("expected base64 text, found {}", json))?;
            STANDARD_LENIENT
                .decode(text)
                .or_else(|_| URL_SAFE_LENIENT.decode(text))
                .map(ScalarValue::Bytes)
                .map_err(|e| format!("invalid base64: {}", e))
        }
        _ => Err(format!("{} values are not scalars", kind)),
    }
}

fn parse_i64(json: &Json) -> Result<i64, String> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| is_integral(*f)).map(|f| f as i64))
            .ok_or_else(|| format!("{} is not a signed 64-bit integer", n)),
        Json::String(s) => s
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not a signed 64-bit integer", s)),
        other => Err(format!("expected an integer, found {}", other)),
    }
}

fn parse_u64(json: &Json) -> Result<u64, String> {
    match json {
        Json::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| is_integral(*f) && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .ok_or_else(|| format!("{} is not an unsigned 64-bit integer", n)),
        Json::String(s) => s
            .parse::<u64>()
            .map_err(|_| format!("'{}' is not an unsigned 64-bit integer", s)),
        other => Err(format!("expected an integer, found {}", other)),
    }
}

/// Whole numbers that survive the round trip through `i64`.
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15
}

fn parse_f64(json: &Json) -> Result<f64, String> {
    match json {
        Json::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{} is not a float", n)),
        Json::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| format!("'{}' is not a float", other)),
        },
        other => Err(format!("expected a number, found {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::from_json_str(
            &json!({
                "package": "d",
                "enums": [{ "name": "Mode", "values": [
                    { "name": "OFF", "number": 0 }, { "name": "ON", "number": 1 }
                ]}],
                "messages": [
                    { "name": "Leaf", "fields": [{ "name": "n", "number": 1, "kind": "int32" }] },
                    { "name": "Root", "fields": [
                        { "name": "big_count", "number": 1, "kind": "int64" },
                        { "name": "ratio", "number": 2, "kind": "double" },
                        { "name": "blob", "number": 3, "kind": "bytes" },
                        { "name": "mode", "number": 4, "kind": "enum", "type": "Mode" },
                        { "name": "leaves", "number": 5, "kind": "message", "type": "Leaf", "label": "repeated" },
                        { "name": "by_id", "number": 6, "map": { "key": "uint32", "value": "string" } },
                        { "name": "a", "number": 7, "kind": "string", "oneof": "pick" },
                        { "name": "b", "number": 8, "kind": "bool", "oneof": "pick" }
                    ]}
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn decodes_protojson_spellings() {
        let msg = registry()
            .decode_json(
                "d.Root",
                &json!({
                    "bigCount": "9007199254740993",
                    "ratio": "-Infinity",
                    "blob": "aGk",
                    "mode": "ON",
                    "leaves": [{ "n": 1 }, {}],
                    "by_id": { "7": "seven" },
                    "a": null
                }),
            )
            .unwrap();
        assert_eq!(msg.value("big_count"), Some(&FieldValue::Int(9_007_199_254_740_993)));
        assert_eq!(msg.value("ratio"), Some(&FieldValue::Float(f64::NEG_INFINITY)));
        assert_eq!(msg.value("blob"), Some(&FieldValue::Bytes(b"hi".to_vec())));
        assert_eq!(msg.value("mode"), Some(&FieldValue::Int(1)));
        assert_eq!(
            msg.value("by_id"),
            Some(&FieldValue::Map(vec![(FieldValue::Uint(7), FieldValue::from("seven"))]))
        );
        assert!(msg.value("a").is_none());
        let Some(FieldValue::List(leaves)) = msg.value("leaves") else {
            panic!("leaves not decoded");
        };
        assert_eq!(leaves.len(), 2);
    }

    #[test]
    fn enums_accept_numbers() {
        let msg = registry().decode_json("d.Root", &json!({ "mode": 1 })).unwrap();
        assert_eq!(msg.value("mode"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn rejects_unknown_fields_with_location() {
        let err = registry()
            .decode_json("d.Root", &json!({ "leaves": [{ "m": 1 }] }))
            .unwrap_err();
        assert_eq!(err.to_string(), "d.Leaf has no field 'm' (at leaves[0])");
    }

    #[test]
    fn rejects_out_of_range_and_conflicting_values() {
        let err = registry()
            .decode_json("d.Leaf", &json!({ "n": 3000000000u64 }))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { .. }));

        let err = registry()
            .decode_json("d.Root", &json!({ "a": "x", "b": true }))
            .unwrap_err();
        assert!(matches!(err, DecodeError::OneofConflict { .. }));
    }

    #[test]
    fn rejects_a_field_given_under_both_spellings() {
        let err = registry()
            .decode_json("d.Root", &json!({ "big_count": 1, "bigCount": 2 }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value at big_count: field is given more than once"
        );

        let err = registry()
            .decode_json("d.Root", &json!({ "big_count": null, "bigCount": 2 }))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { .. }));
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("string_to_simple"), "stringToSimple");
        assert_eq!(camel_case("value"), "value");
    }
}
