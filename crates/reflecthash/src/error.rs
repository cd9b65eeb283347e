use thiserror::Error;

use crate::float::NormalizeError;
use crate::schema::Kind;
use crate::validation::ValidationError;

/// Error returned when a message cannot be hashed.
#[derive(Error, Debug)]
pub enum HashError {
    /// The message failed the validity check.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationError),
    /// The field kind has no canonical encoding.
    #[error("unsupported kind {kind} for field {number} ({name}) at {path}")]
    UnsupportedKind {
        /// Offending kind.
        kind: Kind,
        /// Field name.
        name: String,
        /// Field number.
        number: u32,
        /// Location of the field.
        path: String,
    },
    /// The reflection layer returned a value that does not match the declared kind.
    #[error("field {name} at {path}: expected {expected} value, found {found}")]
    KindMismatch {
        /// Field name.
        name: String,
        /// Location of the value.
        path: String,
        /// Declared kind or shape.
        expected: String,
        /// Variant found instead.
        found: &'static str,
    },
    /// A float could not be normalized.
    #[error("at {path}: {source}")]
    Float {
        /// Location of the value.
        path: String,
        /// Underlying failure.
        source: NormalizeError,
    },
    /// Hashing a map entry failed.
    #[error("hashing map key {key} at {path}: {source}")]
    MapEntry {
        /// Location of the map.
        path: String,
        /// Rendered key of the failing entry.
        key: String,
        /// Underlying failure.
        source: Box<HashError>,
    },
    /// Input to the JSON reference hash could not be parsed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
