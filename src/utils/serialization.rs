// Canonical JSON layer used for every hash in the system
use crate::error::Result;
use crate::utils::crypto::sha256_hexdigest;
use serde::Serialize;

/// Render a value as canonical JSON with object keys in sorted order.
///
/// Going through `serde_json::Value` first is what guarantees the ordering:
/// serde_json's map type keeps keys sorted, so two nodes serializing the
/// same logical object always produce identical bytes.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

/// SHA-256 hex digest of a value's canonical JSON form.
///
/// This is the one hash function used for block headers and transactions
/// alike; a transaction's identity is `hash_object(&hash_object(&tx)?)`.
pub fn hash_object<T: Serialize>(value: &T) -> Result<String> {
    Ok(sha256_hexdigest(canonical_json(value)?.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Ordered {
        alpha: u64,
        zulu: String,
    }

    // Field order reversed on purpose
    #[derive(Serialize)]
    struct Reversed {
        zulu: String,
        alpha: u64,
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let a = Ordered {
            alpha: 7,
            zulu: "z".to_string(),
        };
        let b = Reversed {
            zulu: "z".to_string(),
            alpha: 7,
        };

        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(canonical_json(&a).unwrap(), r#"{"alpha":7,"zulu":"z"}"#);
    }

    #[test]
    fn test_hash_object_is_deterministic() {
        let value = Ordered {
            alpha: 42,
            zulu: "hello".to_string(),
        };
        assert_eq!(hash_object(&value).unwrap(), hash_object(&value).unwrap());
    }

    #[test]
    fn test_hash_object_is_hex_64() {
        let digest = hash_object(&"anything").unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_object_differs_per_value() {
        assert_ne!(hash_object(&1u64).unwrap(), hash_object(&2u64).unwrap());
    }
}
