//! Reference hash of plain JSON documents.
//!
//! Every JSON number is hashed as a float, so a message hashed with field names as
//! keys matches the hash of its JSON rendering whenever that rendering is lossless.

use serde_json::Value as Json;

use crate::container;
use crate::digest::Digest;
use crate::error::HashError;
use crate::path::FieldPath;
use crate::scalar::{hash_bool, hash_float, hash_nil, hash_string};

/// Hashes a parsed JSON value.
pub fn hash_json(value: &Json) -> Result<Digest, HashError> {
    hash_at(value, &FieldPath::root())
}

/// Parses and hashes a JSON document.
pub fn hash_json_str(json: &str) -> Result<Digest, HashError> {
    let value: Json = serde_json::from_str(json)?;
    hash_json(&value)
}

fn hash_at(value: &Json, path: &FieldPath) -> Result<Digest, HashError> {
    match value {
        Json::Null => Ok(hash_nil()),
        Json::Bool(b) => Ok(hash_bool(*b)),
        Json::Number(n) => {
            // Integers beyond 2^53 lose precision here, as in any float-only JSON model.
            let f = n.as_f64().unwrap_or(f64::NAN);
            hash_float(f).map_err(|source| HashError::Float {
                path: path.to_string(),
                source,
            })
        }
        Json::String(s) => Ok(hash_string(s)),
        Json::Array(items) => {
            let digests = items
                .iter()
                .enumerate()
                .map(|(index, item)| hash_at(item, &path.push_index(index)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(container::hash_list(&digests))
        }
        Json::Object(object) => {
            let entries = object
                .iter()
                .map(|(key, item)| Ok((hash_string(key), hash_at(item, &path.push_field(key))?)))
                .collect::<Result<Vec<_>, HashError>>()?;
            Ok(container::hash_map(entries))
        }
    }
}
