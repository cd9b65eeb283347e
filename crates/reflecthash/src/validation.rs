use std::collections::BTreeSet;
use thiserror::Error;

use crate::path::FieldPath;
use crate::reflect::{ReflectMessage, Value};
use crate::schema::{FieldDescriptor, Kind};

/// Validation errors for messages and canonical primitives.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A required field is not set.
    #[error("required field {path} is not set")]
    MissingRequired {
        /// Location of the missing field.
        path: String,
    },
    /// More than one member of a oneof is set.
    #[error("oneof {oneof} at {path} has several members set: {}", fields.join(", "))]
    OneofConflict {
        /// Location of the containing message.
        path: String,
        /// Oneof name.
        oneof: String,
        /// Names of the members that are set.
        fields: Vec<String>,
    },
    /// An integer or float does not fit the declared width.
    #[error("{value} at {path} is out of range for {kind}")]
    OutOfRange {
        /// Location of the value.
        path: String,
        /// Declared kind.
        kind: Kind,
        /// Offending value.
        value: String,
    },
    /// A value variant does not agree with the declared kind or shape.
    #[error("expected {expected} at {path}, found {found}")]
    KindMismatch {
        /// Location of the value.
        path: String,
        /// Declared kind or shape.
        expected: String,
        /// Variant found instead.
        found: &'static str,
    },
    /// A nested message has a different type than declared.
    #[error("expected message {expected} at {path}, found {found}")]
    TypeMismatch {
        /// Location of the value.
        path: String,
        /// Declared message type.
        expected: String,
        /// Actual message type.
        found: String,
    },
    /// The message type has no such field.
    #[error("{message} has no field {field}")]
    UnknownField {
        /// Message type.
        message: String,
        /// Requested field name or number.
        field: String,
    },
    /// A map holds the same key twice.
    #[error("duplicate map key {key} at {path}")]
    DuplicateMapKey {
        /// Location of the map.
        path: String,
        /// Rendered key.
        key: String,
    },
}

/// Validates `message` and everything nested inside it.
pub fn validate_message<M: ReflectMessage + ?Sized>(message: &M) -> Result<(), ValidationError> {
    validate_at(message, &FieldPath::root())
}

fn validate_at<M: ReflectMessage + ?Sized>(
    message: &M,
    path: &FieldPath,
) -> Result<(), ValidationError> {
    let md = message.descriptor();
    for field in md.fields() {
        let field_path = path.push_field(field.name());
        if !message.has(field) {
            if field.is_required() {
                return Err(ValidationError::MissingRequired {
                    path: field_path.to_string(),
                });
            }
            continue;
        }
        check_field(field, &message.get(field), &field_path)?;
    }
    for oneof in md.oneofs() {
        let set: Vec<String> = oneof
            .fields(md)
            .filter(|f| message.has(f))
            .map(|f| f.name().to_string())
            .collect();
        if set.len() > 1 {
            return Err(ValidationError::OneofConflict {
                path: path.to_string(),
                oneof: oneof.name().to_string(),
                fields: set,
            });
        }
    }
    Ok(())
}

fn check_field(
    field: &FieldDescriptor,
    value: &Value<'_>,
    path: &FieldPath,
) -> Result<(), ValidationError> {
    if let Some(entry) = field.map_entry() {
        let Value::Map(entries) = value else {
            return Err(mismatch("map", value, path));
        };
        let mut seen = BTreeSet::new();
        for (key, item) in entries {
            let rendered = key.render_key();
            let entry_path = path.push_key(&rendered);
            check_value(&entry.key, key, &entry_path)?;
            check_value(&entry.value, item, &entry_path)?;
            if !seen.insert(rendered.clone()) {
                return Err(ValidationError::DuplicateMapKey {
                    path: path.to_string(),
                    key: rendered,
                });
            }
        }
        return Ok(());
    }
    if field.is_list() {
        let Value::List(items) = value else {
            return Err(mismatch("list", value, path));
        };
        for (index, item) in items.iter().enumerate() {
            check_value(field, item, &path.push_index(index))?;
        }
        return Ok(());
    }
    check_value(field, value, path)
}

fn check_value(
    field: &FieldDescriptor,
    value: &Value<'_>,
    path: &FieldPath,
) -> Result<(), ValidationError> {
    let kind = field.kind();
    match (kind, value) {
        (Kind::Bool, Value::Bool(_)) => Ok(()),
        (k, Value::Int(i)) if k.is_signed() => {
            if k.is_32_bit() && i32::try_from(*i).is_err() {
                return Err(out_of_range(kind, i, path));
            }
            Ok(())
        }
        (k, Value::Uint(u)) if k.is_unsigned() => {
            if k.is_32_bit() && u32::try_from(*u).is_err() {
                return Err(out_of_range(kind, u, path));
            }
            Ok(())
        }
        (Kind::Float, Value::Float(f)) => {
            let narrowed = *f as f32;
            if f.is_finite() && f64::from(narrowed) != *f {
                return Err(out_of_range(kind, f, path));
            }
            Ok(())
        }
        (Kind::Double, Value::Float(_)) => Ok(()),
        (Kind::String, Value::String(_)) => Ok(()),
        (Kind::Bytes, Value::Bytes(_)) => Ok(()),
        (Kind::Message | Kind::Group, Value::Message(nested)) => {
            if let Some(expected) = field.type_name() {
                let found = nested.descriptor().full_name();
                if found != expected {
                    return Err(ValidationError::TypeMismatch {
                        path: path.to_string(),
                        expected: expected.to_string(),
                        found: found.to_string(),
                    });
                }
            }
            validate_at(*nested, path)
        }
        _ => Err(mismatch(kind.as_str(), value, path)),
    }
}

fn mismatch(expected: &str, found: &Value<'_>, path: &FieldPath) -> ValidationError {
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
