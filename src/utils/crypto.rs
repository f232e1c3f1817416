use data_encoding::HEXLOWER;
use ring::digest::{Context, SHA256};

use crate::error::{NodeError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| NodeError::Io(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in i64
    if duration > i64::MAX as u128 {
        return Err(NodeError::Io("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 digest rendered as a lowercase 64-character hex string
pub fn sha256_hexdigest(data: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(data).as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hexdigest_known_vector() {
        // NIST test vector for "abc"
        assert_eq!(
            sha256_hexdigest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hexdigest_length() {
        assert_eq!(sha256_hexdigest(b"").len(), 64);
        assert_eq!(sha256_hexdigest(b"meshchain").len(), 64);
    }

    #[test]
    fn test_current_timestamp_is_positive() {
        let ts = current_timestamp().unwrap();
        assert!(ts > 0);
    }

    #[test]
    fn test_current_timestamp_is_monotonic_enough() {
        let a = current_timestamp().unwrap();
        let b = current_timestamp().unwrap();
        assert!(b >= a);
    }
}
