//! Deterministic content digests for schema-typed messages.
//!
//! Messages are hashed through a reflection interface ([`ReflectMessage`]) rather than
//! their wire encoding, so two messages that mean the same thing hash the same way
//! regardless of field order, map iteration order, or default elision. Scalars, lists
//! and maps follow the objecthash tagging scheme; a message is a map keyed by field
//! number (or by field name, see [`HashOptions`]).
//!
//! Runtime schemas are loaded into a [`Registry`], populated as [`DynamicMessage`]s
//! (directly or from JSON), and hashed with [`hash_message`].
//!
#![deny(missing_docs)]

/// List and map composition over element digests.
pub mod container;
/// JSON decoding of messages.
pub mod decode;
/// Digest type and type tags.
pub mod digest;
/// Runtime message values.
pub mod dynamic;
/// Hashing errors.
pub mod error;
/// Canonical float strings.
pub mod float;
/// Message traversal.
pub mod hasher;
/// Plain JSON reference hash.
pub mod json_hash;
/// Hashing options.
pub mod options;
/// Locations inside a message tree.
pub mod path;
/// Reflection interface.
pub mod reflect;
/// Schema documents and the descriptor registry.
pub mod registry;
/// Scalar hashing primitives.
pub mod scalar;
/// Message, field and enum descriptors.
pub mod schema;
/// Structural checks run before hashing.
pub mod validation;

pub use decode::DecodeError;
pub use digest::{Digest, Tag, DIGEST_LEN};
pub use dynamic::{DynamicMessage, FieldValue};
pub use error::HashError;
pub use float::{normalize, NormalizeError};
pub use hasher::{hash_message, hash_message_hex, MessageHasher};
pub use json_hash::{hash_json, hash_json_str};
pub use options::HashOptions;
pub use path::FieldPath;
pub use reflect::{ReflectMessage, ScalarValue, Value};
pub use registry::{Registry, SchemaError, SchemaFile};
pub use schema::{
    Cardinality, EnumDescriptor, FieldDescriptor, Kind, MapEntry, MessageDescriptor,
    OneofDescriptor,
};
pub use validation::ValidationError;
