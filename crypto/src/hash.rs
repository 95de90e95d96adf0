//! Blake2b hashing and canonical payload digests.
//!
//! A payload is canonicalized by converting it to a JSON value, sorting every
//! object's keys, and normalizing numbers (integral floats become integers,
//! `-0.0` becomes `0`). The digest is Blake2b-256 over the compact encoding.

use attest_types::ActivityHash;
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::CryptoError;

type Blake2b256 = Blake2b<U32>;

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Convert a serializable payload into its canonical JSON value.
pub fn canonicalize<T: Serialize + ?Sized>(payload: &T) -> Result<Value, CryptoError> {
    let value = serde_json::to_value(payload)?;
    Ok(normalize(value))
}

/// Canonical byte encoding of a payload.
pub fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>, CryptoError> {
    let value = canonicalize(payload)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Deterministic digest of a payload, invariant to field order.
pub fn hash_payload<T: Serialize + ?Sized>(payload: &T) -> Result<ActivityHash, CryptoError> {
    let bytes = canonical_bytes(payload)?;
    Ok(ActivityHash::new(blake2b_256(&bytes)))
}

fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, normalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Number(n) => Value::Number(normalize_number(n)),
        other => other,
    }
}

fn normalize_number(n: Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n;
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => Number::from(0u8),
        Some(f) if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER => Number::from(f as i64),
        _ => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn blake2b_deterministic() {
        let h1 = blake2b_256(b"hello attest");
        let h2 = blake2b_256(b"hello attest");
        assert_eq!(h1, h2);
    }

    #[test]
    fn blake2b_different_inputs() {
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn canonical_form_sorts_nested_keys() {
        let bytes = canonical_bytes(&json!({"b": {"z": 1, "a": 2}, "a": [ {"y": 0, "x": 1} ]}))
            .expect("canonical");
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":[{"x":1,"y":0}],"b":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn struct_and_map_with_same_fields_hash_equal() {
        #[derive(Serialize)]
        struct Vote {
            validator: u64,
            kind: &'static str,
            stake: u64,
        }
        let from_struct = hash_payload(&Vote {
            validator: 7,
            kind: "approve",
            stake: 100,
        })
        .unwrap();

        let mut map: HashMap<&str, Value> = HashMap::new();
        map.insert("stake", json!(100));
        map.insert("kind", json!("approve"));
        map.insert("validator", json!(7));
        assert_eq!(hash_payload(&map).unwrap(), from_struct);
    }

    #[test]
    fn integral_floats_normalize_to_integers() {
        let a = hash_payload(&json!({"value": 3.0})).unwrap();
        let b = hash_payload(&json!({"value": 3})).unwrap();
        assert_eq!(a, b);
        let neg_zero = hash_payload(&json!({"value": -0.0})).unwrap();
        let zero = hash_payload(&json!({"value": 0})).unwrap();
        assert_eq!(neg_zero, zero);
    }

    #[test]
    fn fractional_floats_are_preserved() {
        let a = hash_payload(&json!({"reputation": 0.5})).unwrap();
        let b = hash_payload(&json!({"reputation": 0.25})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn non_string_map_keys_are_invalid() {
        let mut map: HashMap<(u8, u8), u8> = HashMap::new();
        map.insert((1, 2), 3);
        let err = hash_payload(&map).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPayload(_)));
    }
}
