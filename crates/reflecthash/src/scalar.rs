//! Leaf encoders: each scalar is hashed as `SHA256(tag || payload)`.

use crate::digest::{Digest, Tag};
use crate::float::{self, NormalizeError};

/// Digest of the nil value.
pub fn hash_nil() -> Digest {
    Digest::tagged(Tag::Nil, b"")
}

/// Digest of a boolean (`b` + `0`/`1`).
pub fn hash_bool(value: bool) -> Digest {
    let payload: &[u8] = if value { b"1" } else { b"0" };
    Digest::tagged(Tag::Bool, payload)
}

/// Digest of a signed integer as its decimal string.
pub fn hash_int(value: i64) -> Digest {
    Digest::tagged(Tag::Int, value.to_string().as_bytes())
}

/// Digest of an unsigned integer. Shares the `i` tag with signed values.
pub fn hash_uint(value: u64) -> Digest {
    Digest::tagged(Tag::Int, value.to_string().as_bytes())
}

/// Digest of a float of either width, widened to `f64` by the caller.
pub fn hash_float(value: f64) -> Result<Digest, NormalizeError> {
    let normalized = float::normalize(value)?;
    Ok(Digest::tagged(Tag::Float, normalized.as_bytes()))
}

/// Digest of a string's UTF-8 bytes. No Unicode normalization is applied.
pub fn hash_string(value: &str) -> Digest {
    Digest::tagged(Tag::Unicode, value.as_bytes())
}

/// Digest of an opaque byte sequence.
pub fn hash_bytes(value: &[u8]) -> Digest {
    Digest::tagged(Tag::Raw, value)
}
