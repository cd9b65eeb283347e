//! List and map composition over already-computed element digests.

use crate::digest::{Digest, Tag};

/// Hashes an ordered list: `SHA256('l' || d0 || d1 || ...)`.
pub fn hash_list(items: &[Digest]) -> Digest {
    Digest::tagged_concat(Tag::List, items)
}

/// Hashes key/value digest pairs after sorting them by key digest bytes.
///
/// Keys are compared as unsigned byte strings, so the result does not depend on
/// insertion order or on the key type.
pub fn hash_map(mut entries: Vec<(Digest, Digest)>) -> Digest {
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
    Digest::tagged_concat(Tag::Dict, entries.iter().flat_map(|(k, v)| [k, v]))
}

/// Hashes key/value digest pairs in the order given.
///
/// Messages use this after ordering their fields by number.
pub fn hash_ordered_pairs(entries: &[(Digest, Digest)]) -> Digest {
    Digest::tagged_concat(Tag::Dict, entries.iter().flat_map(|(k, v)| [k, v]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{hash_int, hash_nil, hash_string};

    #[test]
    fn list_literals() {
        assert_eq!(
            hash_list(&[]).to_hex(),
            "acac86c0e609ca906f632b0e2dacccb2b77d22b0621f20ebece1a4835b93f6f0"
        );
        let items = [hash_string("foo"), hash_string("bar")];
        assert_eq!(
            hash_list(&items).to_hex(),
            "32ae896c413cfdc79eec68be9139c86ded8b279238467c216cf2bec4d5f1e4a2"
        );
    }

    #[test]
    fn empty_list_is_neither_nil_nor_empty_string() {
        let empty = hash_list(&[]);
        assert_ne!(empty, hash_nil());
        assert_ne!(empty, hash_string(""));
    }

    #[test]
    fn list_order_matters() {
        let ab = hash_list(&[hash_int(1), hash_int(2)]);
        let ba = hash_list(&[hash_int(2), hash_int(1)]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn map_order_does_not_matter() {
        let e = |k: &str, v: &str| (hash_string(k), hash_string(v));
        let a = hash_map(vec![e("k1", "v1"), e("k2", "v2"), e("k3", "v3")]);
        let b = hash_map(vec![e("k3", "v3"), e("k1", "v1"), e("k2", "v2")]);
        assert_eq!(a, b);
        assert_eq!(
            a.to_hex(),
            "ddd65f1f7568269a30df7cafc26044537dc2f02a1a0d830da61762fc3e687057"
        );
    }

    #[test]
    fn int_keyed_map_literal() {
        let digest = hash_map(vec![(hash_int(0), hash_string("ZERO"))]);
        assert_eq!(
            digest.to_hex(),
            "8cda73a524d09ce6fa10b071cacd4c725521b660ee4a546b6ebdbf139370e9b9"
        );
    }

    #[test]
    fn empty_map_equals_empty_message() {
        assert_eq!(hash_map(Vec::new()), hash_ordered_pairs(&[]));
    }
}
