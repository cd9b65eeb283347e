use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

use crate::validation::ValidationError;

/// Size of every digest produced by this crate, in bytes.
pub const DIGEST_LEN: usize = 32;

/// One-byte type tags prefixed to every hash input.
///
/// Sorted by tag value. Messages and maps share [`Tag::Dict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// `b`: booleans.
    Bool,
    /// `d`: maps and messages.
    Dict,
    /// `f`: floats of any width.
    Float,
    /// `i`: signed and unsigned integers, enums.
    Int,
    /// `l`: ordered lists.
    List,
    /// `n`: nil / absent message.
    Nil,
    /// `r`: raw byte sequences.
    Raw,
    /// `u`: Unicode strings.
    Unicode,
}

impl Tag {
    /// Returns the tag byte.
    pub const fn byte(self) -> u8 {
        match self {
            Tag::Bool => b'b',
            Tag::Dict => b'd',
            Tag::Float => b'f',
            Tag::Int => b'i',
            Tag::List => b'l',
            Tag::Nil => b'n',
            Tag::Raw => b'r',
            Tag::Unicode => b'u',
        }
    }
}

/// SHA-256 digest of a tagged canonical payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Computes `SHA256(tag || payload)`.
    pub fn tagged(tag: Tag, payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([tag.byte()]);
        hasher.update(payload);
        Self::finish(hasher)
    }

    /// Computes `SHA256(tag || parts[0] || parts[1] || ...)` without joining the parts first.
    pub fn tagged_concat<'a, I>(tag: Tag, parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Digest>,
    {
        let mut hasher = Sha256::new();
        hasher.update([tag.byte()]);
        for part in parts {
            hasher.update(part.as_bytes());
        }
        Self::finish(hasher)
    }

    fn finish(hasher: Sha256) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Borrows the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Consumes the digest, returning the raw bytes.
    pub fn into_bytes(self) -> [u8; DIGEST_LEN] {
        self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a lowercase 64-character hex digest.
    pub fn parse_hex(value: &str) -> Result<Self, ValidationError> {
        static HEX_DIGEST: OnceLock<Regex> = OnceLock::new();
        let re = HEX_DIGEST.get_or_init(|| Regex::new(r"^[0-9a-f]{64}$").expect("invalid regex"));
        if !re.is_match(value) {
            return Err(ValidationError::PatternMismatch {
                field: "digest",
                value: value.to_string(),
            });
        }
        let mut bytes = [0u8; DIGEST_LEN];
        hex::decode_to_slice(value, &mut bytes).map_err(|_| ValidationError::PatternMismatch {
            field: "digest",
            value: value.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_digest_of_empty_dict() {
        let digest = Digest::tagged(Tag::Dict, b"");
        assert_eq!(
            digest.to_hex(),
            "18ac3e7343f016890c510e93f935261169d9e3f565436429830faf0934f4f8e4"
        );
    }

    #[test]
    fn tagged_concat_matches_joined_payload() {
        let a = Digest::tagged(Tag::Int, b"1");
        let b = Digest::tagged(Tag::Int, b"2");
        let mut joined = a.as_bytes().to_vec();
        joined.extend_from_slice(b.as_bytes());
        assert_eq!(
            Digest::tagged_concat(Tag::List, [&a, &b]),
            Digest::tagged(Tag::List, &joined)
        );
    }

    #[test]
    fn hex_round_trips_through_serde() {
        let digest = Digest::tagged(Tag::Nil, b"");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(
            json,
            "\"1b16b1df538ba12dc3f97edbb85caa7050d46c148134290feba80f8236c83db9\""
        );
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn parse_hex_is_repeatable() {
        let hex = Digest::tagged(Tag::Bool, b"1").to_hex();
        for _ in 0..3 {
            assert_eq!(Digest::parse_hex(&hex).unwrap().to_hex(), hex);
            assert!(Digest::parse_hex("xyz").is_err());
        }
    }

    #[test]
    fn parse_hex_rejects_uppercase_and_short_input() {
        assert!(Digest::parse_hex("ABCD").is_err());
        assert!(Digest::parse_hex(&"A".repeat(64)).is_err());
    }
}
