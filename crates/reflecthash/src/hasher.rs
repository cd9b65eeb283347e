//! Message traversal: field collection, ordering, and composition.
//!
//! A message digest is `SHA256('d' || k1 || v1 || k2 || v2 ...)` over its present,
//! non-default fields ordered by field number, where `k` is the key hash (number or
//! name) and `v` the value hash. Oneof members are pooled with ordinary fields.

use tracing::{debug, trace};

use crate::container;
use crate::digest::Digest;
use crate::error::HashError;
use crate::options::HashOptions;
use crate::path::FieldPath;
use crate::reflect::{ReflectMessage, Value};
use crate::scalar::{
    hash_bool, hash_bytes, hash_float, hash_int, hash_nil, hash_string, hash_uint,
};
use crate::schema::{FieldDescriptor, Kind, MapEntry};

/// Hashes `message`, or nil when absent, after checking it is well-formed.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use reflecthash::{hash_message_hex, DynamicMessage, FieldDescriptor, HashOptions, Kind, MessageDescriptor};
///
/// let descriptor = Arc::new(MessageDescriptor::new(
///     "example.Point",
///     vec![FieldDescriptor::new("x", 1, Kind::Int64)],
///     vec![],
/// ));
/// let empty = DynamicMessage::new(descriptor);
/// let hex = hash_message_hex(Some(&empty), &HashOptions::default())?;
/// assert_eq!(hex, "18ac3e7343f016890c510e93f935261169d9e3f565436429830faf0934f4f8e4");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// Returns [`HashError::Invalid`] when validation fails, or the first failure met
/// during traversal.
pub fn hash_message(
    message: Option<&dyn ReflectMessage>,
    options: &HashOptions,
) -> Result<Digest, HashError> {
    MessageHasher::new(*options).hash(message)
}

/// Like [`hash_message`], rendered as 64 lowercase hex characters.
pub fn hash_message_hex(
    message: Option<&dyn ReflectMessage>,
    options: &HashOptions,
) -> Result<String, HashError> {
    hash_message(message, options).map(|digest| digest.to_hex())
}

/// Hash of one collected field.
struct FieldHash {
    number: u32,
    key: Digest,
    value: Digest,
}

/// Canonical hasher for reflected messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageHasher {
    options: HashOptions,
}

impl MessageHasher {
    /// Creates a hasher with the given options.
    pub fn new(options: HashOptions) -> Self {
        Self { options }
    }

    /// Options this hasher was built with.
    pub fn options(&self) -> &HashOptions {
        &self.options
    }

    /// Validates and hashes `message`; an absent message hashes as nil.
    pub fn hash<M: ReflectMessage + ?Sized>(
        &self,
        message: Option<&M>,
    ) -> Result<Digest, HashError> {
        let Some(message) = message else {
            debug!("hashing absent message as nil");
            return Ok(hash_nil());
        };
        message.validate()?;
        self.hash_message(message)
    }

    /// Hashes `message` without the validity check.
    pub fn hash_message<M: ReflectMessage + ?Sized>(
        &self,
        message: &M,
    ) -> Result<Digest, HashError> {
        debug!(
            message = message.descriptor().full_name(),
            field_names_as_keys = self.options.use_field_names_as_keys,
            "hashing message"
        );
        self.hash_message_at(message, &FieldPath::root())
    }

    fn hash_message_at<M: ReflectMessage + ?Sized>(
        &self,
        message: &M,
        path: &FieldPath,
    ) -> Result<Digest, HashError> {
        let md = message.descriptor();
        let mut fields = self.hash_fields(message, md.ordinary_fields(), path)?;
        for oneof in md.oneofs() {
            fields.extend(self.hash_fields(message, oneof.fields(md), path)?);
        }
        fields.sort_by_key(|f| f.number);

        let pairs: Vec<(Digest, Digest)> = fields.into_iter().map(|f| (f.key, f.value)).collect();
        Ok(container::hash_ordered_pairs(&pairs))
    }

    fn hash_fields<'d, M, I>(
        &self,
        message: &M,
        fields: I,
        path: &FieldPath,
    ) -> Result<Vec<FieldHash>, HashError>
    where
        M: ReflectMessage + ?Sized,
        I: Iterator<Item = &'d FieldDescriptor>,
    {
        let mut hashes = Vec::new();
        for field in fields {
            if !message.has(field) {
                continue;
            }
            let value = message.get(field);
            if value.is_empty_container() {
                continue;
            }
            if let Some(default) = field.default_value() {
                if value.scalar_eq(&default) {
                    trace!(field = field.name(), "skipping default value");
                    continue;
                }
            }
            let field_path = path.push_field(field.name());
            let value_hash = self.hash_field(field, &value, &field_path)?;
            trace!(field = field.name(), number = field.number(), "hashed field");
            hashes.push(FieldHash {
                number: field.number(),
                key: self.key_hash(field),
                value: value_hash,
            });
        }
        Ok(hashes)
    }

    fn key_hash(&self, field: &FieldDescriptor) -> Digest {
        if self.options.use_field_names_as_keys {
            hash_string(field.name())
        } else {
            hash_uint(u64::from(field.number()))
        }
    }

    fn hash_field(
        &self,
        field: &FieldDescriptor,
        value: &Value<'_>,
        path: &FieldPath,
    ) -> Result<Digest, HashError> {
        if let Some(entry) = field.map_entry() {
            return match value {
                Value::Map(entries) => self.hash_map(entry, entries, path),
                other => Err(mismatch(field, "map", other, path)),
            };
        }
        if field.is_list() {
            return match value {
                Value::List(items) => self.hash_list(field, items, path),
                other => Err(mismatch(field, "list", other, path)),
            };
        }
        self.hash_value(field, value, path)
    }

    fn hash_value(
        &self,
        field: &FieldDescriptor,
        value: &Value<'_>,
        path: &FieldPath,
    ) -> Result<Digest, HashError> {
        match (field.kind(), value) {
            (Kind::Group, _) => Err(HashError::UnsupportedKind {
                kind: Kind::Group,
                name: field.name().to_string(),
                number: field.number(),
                path: path.to_string(),
            }),
            (Kind::Bool, Value::Bool(b)) => Ok(hash_bool(*b)),
            (kind, Value::Int(i)) if kind.is_signed() => Ok(hash_int(*i)),
            (kind, Value::Uint(u)) if kind.is_unsigned() => Ok(hash_uint(*u)),
            (Kind::Float | Kind::Double, Value::Float(f)) => {
                hash_float(*f).map_err(|source| HashError::Float {
                    path: path.to_string(),
                    source,
                })
            }
            (Kind::String, Value::String(s)) => Ok(hash_string(s)),
            (Kind::Bytes, Value::Bytes(b)) => Ok(hash_bytes(b)),
            (Kind::Message, Value::Message(nested)) => self.hash_message_at(*nested, path),
            (Kind::Message, Value::Nil) => Ok(hash_nil()),
            (kind, other) => Err(mismatch(field, kind.as_str(), other, path)),
        }
    }

    fn hash_list(
        &self,
        field: &FieldDescriptor,
        items: &[Value<'_>],
        path: &FieldPath,
    ) -> Result<Digest, HashError> {
        let digests = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.hash_value(field, item, &path.push_index(index)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(container::hash_list(&digests))
    }

    fn hash_map(
        &self,
        entry: &MapEntry,
        entries: &[(Value<'_>, Value<'_>)],
        path: &FieldPath,
    ) -> Result<Digest, HashError> {
        let mut pairs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let rendered = key.render_key();
            let entry_path = path.push_key(&rendered);
            let hashed = self
                .hash_value(&entry.key, key, &entry_path)
                .and_then(|k| Ok((k, self.hash_value(&entry.value, value, &entry_path)?)));
            match hashed {
                Ok(pair) => pairs.push(pair),
                Err(source) => {
                    return Err(HashError::MapEntry {
                        path: path.to_string(),
                        key: rendered,
                        source: Box::new(source),
                    })
                }
            }
        }
        trace!(path = %path, entries = pairs.len(), "hashed map");
        Ok(container::hash_map(pairs))
    }
}

fn mismatch(
    field: &FieldDescriptor,
    expected: &str,
    found: &Value<'_>,
    path: &FieldPath,
) -> HashError {
    HashError::KindMismatch {
        name: field.name().to_string(),
        path: path.to_string(),
        expected: expected.to_string(),
        found: found.type_name(),
    }
}
