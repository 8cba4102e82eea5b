use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::HashError;

/// Serialize `value` to canonical JSON: sorted keys, no insignificant
/// whitespace, no trailing newline.
///
/// `serde_json::Map` is backed by a `BTreeMap` (we do not enable the
/// `preserve_order` feature anywhere in this workspace), so `to_string`
/// already emits object keys in sorted order. This function exists anyway
/// as the single, explicitly-tested seam every hashing call in the
/// workspace must go through — relying on that as an implicit library
/// default would be a consensus hazard the moment a dependency bump
/// changes it.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, HashError> {
    let json_value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&json_value)?)
}

/// SHA-256 of canonical JSON, lowercase hex.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String, HashError> {
    let canonical = to_canonical_json(value)?;
    Ok(hash_str(&canonical))
}

/// SHA-256 of a UTF-8 string, lowercase hex.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// SHA-256 of raw bytes, lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Hash the string concatenation of two hex-encoded hashes, as used to
/// combine Merkle tree siblings and other paired hash commitments.
pub fn hash_pair(left_hex: &str, right_hex: &str) -> String {
    let mut combined = String::with_capacity(left_hex.len() + right_hex.len());
    combined.push_str(left_hex);
    combined.push_str(right_hex);
    hash_str(&combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_object_different_key_order_hashes_equal() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
    }

    #[test]
    fn canonical_json_has_no_insignificant_whitespace() {
        let v = json!({"a": 1, "b": [1, 2, 3]});
        let canonical = to_canonical_json(&v).unwrap();
        assert_eq!(canonical, r#"{"a":1,"b":[1,2,3]}"#);
    }

    #[test]
    fn hash_str_is_deterministic() {
        assert_eq!(hash_str("hello"), hash_str("hello"));
    }

    #[test]
    fn hash_pair_is_order_sensitive() {
        let ab = hash_pair("aa", "bb");
        let ba = hash_pair("bb", "aa");
        assert_ne!(ab, ba);
    }

    #[test]
    fn nested_objects_sort_recursively() {
        let a = json!({"outer": {"z": 1, "a": 2}});
        let b = json!({"outer": {"a": 2, "z": 1}});
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
    }
}
